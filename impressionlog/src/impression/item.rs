//! Tracked element description.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::clock::{Clock, FnClock, SystemClock};

/// Default continuous-visible duration before an item counts as impressed.
pub const DEFAULT_DELAY_TIME_MS: u64 = 2000;

/// Default minimum visible-area fraction.
pub const DEFAULT_RATIO: f32 = 0.5;

/// Identifier of a tracked element within one engine.
///
/// Blanket-implemented for every hashable, cloneable, thread-safe type, so
/// `&'static str`, `String`, integers and tuples all work as keys.
///
/// Keys must be unique per semantically distinct element. Reusing a key for
/// two different elements merges their candidacy and dedup state.
pub trait ImpressionKey: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> ImpressionKey for T where T: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

/// A trackable element and its impression thresholds.
///
/// Identity is the key alone: two items with equal keys are the same element
/// even if their thresholds differ. While an element is a candidate, the
/// thresholds of the item that made it a candidate apply.
#[derive(Clone)]
pub struct ImpressionItem<K> {
    /// Element identifier.
    pub key: K,
    /// Minimum continuous-visible duration in milliseconds.
    pub delay_time_ms: u64,
    /// Minimum visible-area fraction in `[0, 1]`.
    pub ratio: f32,
    clock: Arc<dyn Clock>,
}

impl<K> ImpressionItem<K> {
    /// Create an item with default thresholds and the system clock.
    pub fn new(key: K) -> Self {
        Self {
            key,
            delay_time_ms: DEFAULT_DELAY_TIME_MS,
            ratio: DEFAULT_RATIO,
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the dwell time.
    pub fn with_delay_ms(mut self, delay_time_ms: u64) -> Self {
        self.delay_time_ms = delay_time_ms;
        self
    }

    /// Set the visibility threshold, clamped into `[0, 1]`.
    ///
    /// A NaN threshold is treated as `1.0` so it can never be satisfied by
    /// accident.
    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.ratio = if ratio.is_nan() {
            1.0
        } else {
            ratio.clamp(0.0, 1.0)
        };
        self
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the time source with a closure.
    pub fn with_clock_fn<F>(self, now: F) -> Self
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        self.with_clock(Arc::new(FnClock(now)))
    }

    /// Current time according to this item's clock.
    pub fn observe_start_time(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Whether `ratio` satisfies this item's visibility threshold.
    pub fn is_ratio_satisfied(&self, ratio: f32) -> bool {
        ratio >= self.ratio
    }
}

impl<K: fmt::Debug> fmt::Debug for ImpressionItem<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImpressionItem")
            .field("key", &self.key)
            .field("delay_time_ms", &self.delay_time_ms)
            .field("ratio", &self.ratio)
            .finish_non_exhaustive()
    }
}

impl<K: PartialEq> PartialEq for ImpressionItem<K> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Eq> Eq for ImpressionItem<K> {}

impl<K: Hash> Hash for ImpressionItem<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
