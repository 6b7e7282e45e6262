//! Observer registration for rendering layers.
//!
//! A rendering layer registers each element once when it mounts, forwards
//! every geometry change to the returned [`TrackedElement`], and drops (or
//! [`dispose`](TrackedElement::dispose)s) the handle when the element
//! unmounts. This keeps the engine independent of any UI composition model.
//!
//! # Example
//!
//! ```ignore
//! let row = engine
//!     .track(ImpressionItem::new(row_id).with_ratio(0.5))
//!     .on_ratio_changed(|ratio| tracing::trace!(ratio, "row visibility"))
//!     .on_impression(|item| tracing::info!(key = ?item.key, "row seen"))
//!     .register();
//!
//! // on every layout pass
//! row.layout_changed(size, bounds, viewport);
//!
//! // on unmount
//! row.dispose();
//! ```

mod element;

pub use element::{RatioCallback, TrackedElement, TrackerBuilder};
