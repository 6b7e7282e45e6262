//! Per-engine configuration.

use std::time::Duration;

/// Default interval between dwell-time evaluations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default capacity of the impression broadcast channel.
///
/// Subscribers that fall further behind than this skip the oldest events.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Configuration for an [`ImpressionEngine`](super::ImpressionEngine).
///
/// Thresholds are per element and live on
/// [`ImpressionItem`](super::ImpressionItem); only scheduling and delivery
/// are configured here.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sleep between poll cycles. Bounds the latency added to every dwell time.
    pub poll_interval: Duration,

    /// Capacity of the impression broadcast channel.
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Set the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the broadcast channel capacity.
    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }
}
