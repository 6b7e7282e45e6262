//! Deduplication set of already-impressed keys.

use std::collections::HashSet;

use parking_lot::RwLock;

use super::item::ImpressionKey;

/// Keys that have fired an impression since the last reset.
///
/// Grows monotonically; [`clear`](Self::clear) swaps in an empty set in one
/// step. Marking is an atomic check-and-insert so a key can win the race to
/// be impressed exactly once.
#[derive(Debug)]
pub struct ImpressedSet<K: ImpressionKey> {
    keys: RwLock<HashSet<K>>,
}

impl<K: ImpressionKey> Default for ImpressedSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ImpressionKey> ImpressedSet<K> {
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashSet::new()),
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.keys.read().contains(key)
    }

    /// Record `key` as impressed.
    ///
    /// Returns `false` if it was already present.
    pub fn mark(&self, key: K) -> bool {
        self.keys.write().insert(key)
    }

    /// Replace the set with an empty one, returning how many keys it held.
    pub fn clear(&self) -> usize {
        let previous = std::mem::take(&mut *self.keys.write());
        previous.len()
    }

    /// Point-in-time copy of the impressed keys.
    pub fn snapshot(&self) -> HashSet<K> {
        self.keys.read().clone()
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}
