//! Concurrent candidate set.
//!
//! Holds the elements that currently satisfy their ratio threshold and are
//! waiting out their dwell time. Layout callbacks insert and remove entries
//! from any thread while the poll loop works from snapshots, so no shard
//! lock is ever held while the engine emits events or runs callbacks.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::item::{ImpressionItem, ImpressionKey};

/// A candidate paired with the time it first satisfied its ratio threshold.
#[derive(Debug, Clone)]
pub struct VisibleItem<K> {
    pub item: ImpressionItem<K>,
    /// Milliseconds (item clock) at which uninterrupted visibility began.
    pub start_time: u64,
}

impl<K> VisibleItem<K> {
    /// Milliseconds elapsed since `start_time`, saturating on clock skew.
    pub fn elapsed_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.start_time)
    }

    /// Whether the dwell time has been met at `now`.
    pub fn is_due(&self, now: u64) -> bool {
        self.elapsed_ms(now) >= self.item.delay_time_ms
    }
}

/// Result of offering an item to the candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The item became a candidate with this start time.
    Inserted { start_time: u64 },
    /// The item was already a candidate; its start time is unchanged.
    AlreadyCandidate { start_time: u64 },
}

/// Thread-safe map of key → [`VisibleItem`].
#[derive(Debug)]
pub struct CandidateSet<K: ImpressionKey> {
    entries: DashMap<K, VisibleItem<K>>,
}

impl<K: ImpressionKey> Default for CandidateSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ImpressionKey> CandidateSet<K> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Make `item` a candidate unless it already is.
    ///
    /// The start time is read from the item's clock only on first insertion.
    /// For an existing candidate the stored thresholds are replaced by the
    /// incoming item's but the start time is kept, so repeated layout passes
    /// never restart the dwell timer.
    pub fn admit(&self, item: &ImpressionItem<K>) -> Admission {
        match self.entries.entry(item.key.clone()) {
            Entry::Occupied(mut occupied) => {
                let visible = occupied.get_mut();
                visible.item = item.clone();
                Admission::AlreadyCandidate {
                    start_time: visible.start_time,
                }
            }
            Entry::Vacant(vacant) => {
                let start_time = item.observe_start_time();
                vacant.insert(VisibleItem {
                    item: item.clone(),
                    start_time,
                });
                Admission::Inserted { start_time }
            }
        }
    }

    /// Remove a candidate. Absent keys are a no-op.
    pub fn remove(&self, key: &K) -> Option<VisibleItem<K>> {
        self.entries.remove(key).map(|(_, visible)| visible)
    }

    /// Remove a candidate only if it is still the same candidacy.
    ///
    /// Used by the poll loop so that an entry which was dropped and re-added
    /// between snapshot and removal survives with its fresh start time.
    pub fn remove_if_started_at(&self, key: &K, start_time: u64) -> bool {
        self.entries
            .remove_if(key, |_, visible| visible.start_time == start_time)
            .is_some()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<VisibleItem<K>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Point-in-time copy of all candidates.
    pub fn snapshot(&self) -> Vec<VisibleItem<K>> {
        self.entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
