//! Shared test utilities for the hydrometeor classification workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Test data path helpers
//! - Synthetic polarimetric radar field generators
//! - Membership table fixtures
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, create_radar_field_set, standard_table_text};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Macro for approximate floating-point equality assertions.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(0.6667_f32, 2.0 / 3.0, 1e-3); // passes
/// assert_approx_eq!(0.5_f32, 0.6_f32, 1e-3);      // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Element-wise approximate equality of two float slices. NaN matches NaN.
///
/// ```ignore
/// use test_utils::assert_slices_approx_eq;
///
/// assert_slices_approx_eq!(&[0.5, f32::NAN], &[0.5001, f32::NAN], 1e-3);
/// ```
#[macro_export]
macro_rules! assert_slices_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = $left;
        let right = $right;
        assert_eq!(left.len(), right.len(), "slice lengths differ");
        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            let l = *l as f64;
            let r = *r as f64;
            if l.is_nan() || r.is_nan() {
                assert!(
                    l.is_nan() && r.is_nan(),
                    "index {}: `{:?}` vs `{:?}` (only one is NaN)",
                    i,
                    l,
                    r
                );
                continue;
            }
            let diff = (l - r).abs();
            if diff > $epsilon as f64 {
                panic!(
                    "index {}: `{:?}` vs `{:?}`, diff `{:?}` > epsilon `{:?}`",
                    i, l, r, diff, $epsilon as f64
                );
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
        assert_approx_eq!(2.0_f32 / 3.0, 0.6667, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_rejects_nan() {
        assert_approx_eq!(f32::NAN, 1.0, 0.001);
    }

    #[test]
    fn test_assert_slices_approx_eq_nan_aware() {
        assert_slices_approx_eq!(&[0.5_f32, f32::NAN], &[0.5001_f32, f32::NAN], 0.001);
    }

    #[test]
    #[should_panic(expected = "only one is NaN")]
    fn test_assert_slices_approx_eq_nan_mismatch() {
        assert_slices_approx_eq!(&[0.5_f32, f32::NAN], &[0.5_f32, 0.0], 0.001);
    }
}
