//! Engine telemetry for observability.
//!
//! Lock-free atomic counters updated from the layout callbacks and the poll
//! loop, with a point-in-time snapshot for display.
//!
//! # Architecture
//!
//! ```text
//! ImpressionEngine ─────► EngineMetrics ─────► MetricsSnapshot ─────► Views
//!                        (atomic counters)    (point-in-time copy)    (CLI, logs)
//! ```
//!
//! # Example
//!
//! ```
//! use impressionlog::telemetry::EngineMetrics;
//!
//! let metrics = EngineMetrics::new();
//! metrics.layout_evaluated();
//! metrics.impression_emitted();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.layout_evaluations, 1);
//! assert_eq!(snapshot.impressions_emitted, 1);
//! ```

mod metrics;
mod snapshot;

pub use metrics::EngineMetrics;
pub use snapshot::MetricsSnapshot;
