//! Atomic engine counters.

use std::sync::atomic::{AtomicU64, Ordering};

use super::snapshot::MetricsSnapshot;

/// Counters shared between the layout callbacks and the poll loop.
///
/// All updates use relaxed ordering; counters are independent and only
/// read for reporting.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    layout_evaluations: AtomicU64,
    skipped_impressed: AtomicU64,
    candidates_added: AtomicU64,
    candidates_removed: AtomicU64,
    impressions_emitted: AtomicU64,
    poll_cycles: AtomicU64,
    cache_clears: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A geometry change was evaluated.
    pub fn layout_evaluated(&self) {
        self.layout_evaluations.fetch_add(1, Ordering::Relaxed);
    }

    /// A geometry change was ignored because the key was already impressed.
    pub fn layout_skipped(&self) {
        self.skipped_impressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn candidate_added(&self) {
        self.candidates_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn candidate_removed(&self) {
        self.candidates_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn impression_emitted(&self) {
        self.impressions_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn poll_cycle(&self) {
        self.poll_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_cleared(&self) {
        self.cache_clears.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            layout_evaluations: self.layout_evaluations.load(Ordering::Relaxed),
            skipped_impressed: self.skipped_impressed.load(Ordering::Relaxed),
            candidates_added: self.candidates_added.load(Ordering::Relaxed),
            candidates_removed: self.candidates_removed.load(Ordering::Relaxed),
            impressions_emitted: self.impressions_emitted.load(Ordering::Relaxed),
            poll_cycles: self.poll_cycles.load(Ordering::Relaxed),
            cache_clears: self.cache_clears.load(Ordering::Relaxed),
        }
    }
}
