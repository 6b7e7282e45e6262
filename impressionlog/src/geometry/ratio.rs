//! Visible-area ratio calculation.

use super::rect::{Rect, Size};

/// Outcome of intersecting an element with its viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Visibility {
    /// The rectangles do not overlap on at least one axis.
    ///
    /// Callers treat the element as not visible without applying any
    /// threshold, even a threshold of zero.
    Disjoint,

    /// The rectangles overlap; `ratio` is the visible fraction in `[0, 1]`.
    Overlapping { ratio: f32 },
}

impl Visibility {
    /// The visible fraction, `0.0` when disjoint.
    pub fn ratio(&self) -> f32 {
        match self {
            Visibility::Disjoint => 0.0,
            Visibility::Overlapping { ratio } => *ratio,
        }
    }

    pub fn is_disjoint(&self) -> bool {
        matches!(self, Visibility::Disjoint)
    }
}

/// Intersect `element` with `viewport` and classify the result.
///
/// The visible area is divided by `element_size`'s area rather than the
/// bounds' area, so an element whose bounds are clipped by a parent still
/// reports the fraction of its full content that is on screen.
///
/// Degenerate input never fails:
/// - a negative visible extent on either axis is [`Visibility::Disjoint`];
/// - a zero, negative or non-finite element area gives a ratio of `0.0`;
/// - ratios are clamped into `[0, 1]`.
pub fn visibility(element: &Rect, viewport: &Rect, element_size: Size) -> Visibility {
    let top = element.top.max(viewport.top);
    let bottom = element.bottom.min(viewport.bottom);
    let visible_height = bottom - top;
    if visible_height < 0.0 {
        return Visibility::Disjoint;
    }

    let left = element.left.max(viewport.left);
    let right = element.right.min(viewport.right);
    let visible_width = right - left;
    if visible_width < 0.0 {
        return Visibility::Disjoint;
    }

    let component_area = element_size.area();
    if !(component_area.is_finite() && component_area > 0.0) {
        return Visibility::Overlapping { ratio: 0.0 };
    }

    let ratio = (visible_width * visible_height) / component_area;
    let ratio = if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };

    Visibility::Overlapping { ratio }
}

/// Visible fraction of `element` inside `viewport`, in `[0, 1]`.
///
/// Returns exactly `0.0` for non-overlapping rectangles and zero-area
/// elements. See [`visibility`] for the full classification.
pub fn compute_ratio(element: &Rect, viewport: &Rect, element_size: Size) -> f32 {
    visibility(element, viewport, element_size).ratio()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Rect {
        Rect::new(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn test_fully_contained_is_one() {
        let element = Rect::new(10.0, 10.0, 60.0, 60.0);
        let ratio = compute_ratio(&element, &viewport(), element.size());
        assert!((ratio - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_half_overlap_vertical() {
        let element = Rect::new(0.0, 50.0, 100.0, 150.0);
        let ratio = compute_ratio(&element, &viewport(), Size::new(100.0, 100.0));
        assert!((ratio - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_quarter_overlap_corner() {
        let element = Rect::new(50.0, 50.0, 150.0, 150.0);
        let ratio = compute_ratio(&element, &viewport(), Size::new(100.0, 100.0));
        assert!((ratio - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_below_viewport_is_disjoint() {
        let element = Rect::new(0.0, 120.0, 100.0, 220.0);
        let result = visibility(&element, &viewport(), Size::new(100.0, 100.0));
        assert_eq!(result, Visibility::Disjoint);
        assert_eq!(result.ratio(), 0.0);
    }

    #[test]
    fn test_right_of_viewport_is_disjoint() {
        let element = Rect::new(101.0, 0.0, 201.0, 100.0);
        assert!(visibility(&element, &viewport(), Size::new(100.0, 100.0)).is_disjoint());
    }

    #[test]
    fn test_touching_edge_overlaps_with_zero_ratio() {
        let element = Rect::new(0.0, 100.0, 100.0, 200.0);
        let result = visibility(&element, &viewport(), Size::new(100.0, 100.0));
        assert_eq!(result, Visibility::Overlapping { ratio: 0.0 });
    }

    #[test]
    fn test_zero_area_element_is_zero() {
        let element = Rect::new(10.0, 10.0, 10.0, 10.0);
        assert_eq!(
            compute_ratio(&element, &viewport(), Size::new(0.0, 0.0)),
            0.0
        );
        assert_eq!(
            compute_ratio(&element, &viewport(), Size::new(0.0, 50.0)),
            0.0
        );
    }

    #[test]
    fn test_negative_size_is_zero() {
        let element = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(
            compute_ratio(&element, &viewport(), Size::new(-10.0, 10.0)),
            0.0
        );
    }

    #[test]
    fn test_inverted_element_is_disjoint() {
        let element = Rect::new(60.0, 60.0, 10.0, 10.0);
        assert!(visibility(&element, &viewport(), Size::new(50.0, 50.0)).is_disjoint());
    }

    #[test]
    fn test_ratio_clamped_when_size_smaller_than_bounds() {
        let element = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(
            compute_ratio(&element, &viewport(), Size::new(10.0, 10.0)),
            1.0
        );
    }

    #[test]
    fn test_nan_input_is_zero() {
        let element = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(
            compute_ratio(&element, &viewport(), Size::new(f32::NAN, 10.0)),
            0.0
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_vertically_disjoint_is_exactly_zero(
                left in -500.0..500.0_f32,
                width in 1.0..500.0_f32,
                height in 1.0..500.0_f32,
                gap in 0.001..500.0_f32,
            ) {
                let vp = viewport();
                let element = Rect::new(left, vp.bottom + gap, left + width, vp.bottom + gap + height);
                prop_assert_eq!(compute_ratio(&element, &vp, element.size()), 0.0);
            }

            #[test]
            fn test_horizontally_disjoint_is_exactly_zero(
                top in -500.0..500.0_f32,
                width in 1.0..500.0_f32,
                height in 1.0..500.0_f32,
                gap in 0.001..500.0_f32,
            ) {
                let vp = viewport();
                let element = Rect::new(vp.left - gap - width, top, vp.left - gap, top + height);
                prop_assert_eq!(compute_ratio(&element, &vp, element.size()), 0.0);
            }

            #[test]
            fn test_contained_is_one_regardless_of_viewport(
                left in 0.0..50.0_f32,
                top in 0.0..50.0_f32,
                width in 1.0..50.0_f32,
                height in 1.0..50.0_f32,
                grow in 0.0..10_000.0_f32,
            ) {
                let vp = Rect::new(-grow, -grow, 100.0 + grow, 100.0 + grow);
                let element = Rect::new(left, top, left + width, top + height);
                let ratio = compute_ratio(&element, &vp, Size::new(width, height));
                prop_assert!((ratio - 1.0).abs() < 1e-4, "ratio was {}", ratio);
            }

            #[test]
            fn test_ratio_always_in_unit_interval(
                left in -200.0..200.0_f32,
                top in -200.0..200.0_f32,
                width in -50.0..300.0_f32,
                height in -50.0..300.0_f32,
            ) {
                let element = Rect::new(left, top, left + width, top + height);
                let ratio = compute_ratio(&element, &viewport(), Size::new(width, height));
                prop_assert!((0.0..=1.0).contains(&ratio), "ratio was {}", ratio);
            }
        }
    }
}
