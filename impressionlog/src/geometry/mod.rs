//! Geometry and visibility evaluation.
//!
//! Pure functions that intersect an element's bounding rectangle with its
//! viewport and express the overlap as a fraction of the element's area.
//! Only axis-aligned bounding boxes are modeled; occlusion by other elements
//! is not considered.
//!
//! All inputs share one coordinate space (window or screen coordinates) with
//! `y` growing downwards.

mod ratio;
mod rect;

pub use ratio::{compute_ratio, visibility, Visibility};
pub use rect::{Rect, Size};
