//! Point-in-time view of engine counters.

use std::fmt;

use serde::Serialize;

/// Copy of [`EngineMetrics`](super::EngineMetrics) at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub layout_evaluations: u64,
    pub skipped_impressed: u64,
    pub candidates_added: u64,
    /// Exits from the candidate set, whether by disposal, dropping below
    /// the threshold, or impression.
    pub candidates_removed: u64,
    pub impressions_emitted: u64,
    pub poll_cycles: u64,
    pub cache_clears: u64,
}

impl MetricsSnapshot {
    /// Candidates added but not yet removed.
    pub fn pending_candidates(&self) -> u64 {
        self.candidates_added.saturating_sub(self.candidates_removed)
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "layouts={} skipped={} added={} removed={} impressions={} polls={} clears={}",
            self.layout_evaluations,
            self.skipped_impressed,
            self.candidates_added,
            self.candidates_removed,
            self.impressions_emitted,
            self.poll_cycles,
            self.cache_clears
        )
    }
}
