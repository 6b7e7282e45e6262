//! ImpressionLog - viewability-based impression detection
//!
//! This library decides when a visual element has been visible enough, for
//! long enough, to count as seen by the user. A rendering layer reports
//! geometry changes per element; the engine computes the visible-area ratio,
//! debounces candidates, applies a dwell-time threshold from a single polling
//! task and publishes each impression once until the dedup cache is cleared.
//!
//! # Architecture
//!
//! ```text
//! Rendering layer ──► TrackedElement ──► ImpressionEngine ──► broadcast ──► subscribers
//!   (bounds, viewport,    (per-element      │  ▲
//!    size)                 handle)          ▼  │
//!                                     geometry::visibility
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use impressionlog::geometry::{Rect, Size};
//! use impressionlog::impression::{EngineConfig, ImpressionEngine, ImpressionItem};
//!
//! let engine = Arc::new(ImpressionEngine::new(EngineConfig::default()));
//! engine.start()?;
//!
//! let mut impressions = engine.subscribe();
//! let element = engine
//!     .track(ImpressionItem::new("row-1").with_delay_ms(1000))
//!     .on_impression(|item| tracing::info!(key = ?item.key, "seen"))
//!     .register();
//!
//! element.layout_changed(
//!     Size::new(100.0, 100.0),
//!     Rect::new(0.0, 0.0, 100.0, 100.0),
//!     Rect::new(0.0, 0.0, 400.0, 800.0),
//! );
//! ```

pub mod config;
pub mod geometry;
pub mod impression;
pub mod logging;
pub mod telemetry;
pub mod tracker;

pub use impression::{EngineConfig, ImpressionEngine, ImpressionItem, ImpressionKey};
