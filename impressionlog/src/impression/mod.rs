//! Impression detection engine.
//!
//! An element becomes a *candidate* when its visible ratio reaches its
//! threshold, and is *impressed* once it has stayed a candidate for its dwell
//! time. Each key is impressed at most once until
//! [`ImpressionEngine::clear_cache`] is called.
//!
//! # Components
//!
//! - [`ImpressionItem`] - per-element thresholds and clock
//! - [`CandidateSet`] - concurrent key → [`VisibleItem`] map
//! - [`ImpressedSet`] - dedup set, reset as a whole
//! - [`ImpressionEngine`] - geometry callbacks, poll loop, broadcast output
//! - [`Lifecycle`] - external start/stop signal for the poll loop
//!
//! # Example
//!
//! ```ignore
//! use impressionlog::impression::{EngineConfig, ImpressionEngine, ImpressionItem};
//!
//! let engine = Arc::new(ImpressionEngine::new(EngineConfig::default()));
//! engine.start()?;
//!
//! let item = ImpressionItem::new(42_u64).with_delay_ms(1000).with_ratio(0.5);
//! engine.on_layout_changed(&item, size, bounds, viewport, |_| {});
//! ```

mod candidates;
mod clock;
mod config;
mod engine;
mod error;
mod impressed;
mod item;
mod lifecycle;
mod listeners;

pub use candidates::{Admission, CandidateSet, VisibleItem};
pub use clock::{Clock, FnClock, ManualClock, SystemClock};
pub use config::{EngineConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_POLL_INTERVAL};
pub use engine::{ImpressionEngine, LayoutOutcome};
pub use error::EngineError;
pub use impressed::ImpressedSet;
pub use item::{ImpressionItem, ImpressionKey, DEFAULT_DELAY_TIME_MS, DEFAULT_RATIO};
pub use lifecycle::Lifecycle;
pub use listeners::{ImpressionCallback, ListenerId};
