//! Trapezoidal fuzzification.

use hydro_common::{HydroError, HydroResult};
use rayon::prelude::*;

use crate::indexer::DEFAULT_BINS_PER_TASK;
use crate::types::{CornerCube, DegreeCube, Trapezoid, CORNERS};

/// Membership degree of `x` in the trapezoid `(a, b, c, d)`.
///
/// ```text
/// 0            x <= a or x >= d
/// (x-a)/(b-a)  a < x < b
/// 1            b <= x <= c
/// (d-x)/(d-c)  c < x < d
/// ```
///
/// The plateau test runs first, so a collapsed ramp (`a == b` or `c == d`)
/// evaluates to 1 at the shared corner instead of dividing by zero. NaN in
/// `x` or any corner gives NaN. Ramps are evaluated in f64 and stay strictly
/// between 0 and 1 after narrowing.
#[inline]
pub fn trapezoid(x: f32, t: &Trapezoid) -> f32 {
    trapezoid_corners(x, t.a, t.b, t.c, t.d)
}

#[inline]
fn trapezoid_corners(x: f32, a: f32, b: f32, c: f32, d: f32) -> f32 {
    if x.is_nan() || a.is_nan() || b.is_nan() || c.is_nan() || d.is_nan() {
        return f32::NAN;
    }
    if x >= b && x <= c {
        1.0
    } else if x <= a || x >= d {
        0.0
    } else if x < b {
        // a < x < b, so b > a
        ramp(f64::from(x) - f64::from(a), f64::from(b) - f64::from(a))
    } else {
        // c < x < d, so d > c
        ramp(f64::from(d) - f64::from(x), f64::from(d) - f64::from(c))
    }
}

/// Largest f32 below 1.
const BELOW_ONE: f32 = 1.0 - f32::EPSILON / 2.0;

#[inline]
fn ramp(rise: f64, run: f64) -> f32 {
    ((rise / run) as f32).clamp(f32::MIN_POSITIVE, BELOW_ONE)
}

/// Score every observable of every bin against its corner sets.
///
/// `observations[o]` is the measured field of the cube's observable `o`; all
/// fields must have `corners.num_bins` values.
pub fn fuzzify(corners: &CornerCube, observations: &[&[f32]]) -> HydroResult<DegreeCube> {
    fuzzify_chunked(corners, observations, DEFAULT_BINS_PER_TASK)
}

/// [`fuzzify`] with an explicit parallel chunk size in bins.
pub fn fuzzify_chunked(
    corners: &CornerCube,
    observations: &[&[f32]],
    bins_per_task: usize,
) -> HydroResult<DegreeCube> {
    if observations.len() != corners.num_observables {
        return Err(HydroError::configuration(format!(
            "fuzzify received {} observation fields for {} observables",
            observations.len(),
            corners.num_observables
        )));
    }
    for (o, field) in observations.iter().enumerate() {
        if field.len() != corners.num_bins {
            return Err(HydroError::shape_mismatch(
                format!("observable #{}", o),
                &[corners.num_bins],
                &[field.len()],
            ));
        }
    }

    let num_bins = corners.num_bins;
    let num_classes = corners.num_classes;
    let num_obs = corners.num_observables;
    let out_stride = num_classes * num_obs;
    let in_stride = out_stride * CORNERS;
    let mut data = vec![f32::NAN; num_bins * out_stride];

    if out_stride > 0 {
        let chunk_bins = bins_per_task.max(1);
        data.par_chunks_mut(chunk_bins * out_stride)
            .zip(corners.data.par_chunks(chunk_bins * in_stride))
            .enumerate()
            .for_each(|(chunk, (out, cin))| {
                let first_bin = chunk * chunk_bins;
                for (local, (bin_out, bin_in)) in out
                    .chunks_exact_mut(out_stride)
                    .zip(cin.chunks_exact(in_stride))
                    .enumerate()
                {
                    let bin = first_bin + local;
                    for class in 0..num_classes {
                        for o in 0..num_obs {
                            let k = class * num_obs + o;
                            let c = &bin_in[k * CORNERS..(k + 1) * CORNERS];
                            bin_out[k] = trapezoid_corners(observations[o][bin], c[0], c[1], c[2], c[3]);
                        }
                    }
                }
            });
    }

    Ok(DegreeCube {
        num_bins,
        num_classes,
        num_observables: num_obs,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(a: f32, b: f32, c: f32, d: f32) -> Trapezoid {
        Trapezoid::new(a, b, c, d)
    }

    #[test]
    fn test_regions() {
        let tr = t(0.0, 10.0, 20.0, 30.0);
        assert_eq!(trapezoid(-5.0, &tr), 0.0);
        assert_eq!(trapezoid(0.0, &tr), 0.0);
        assert_eq!(trapezoid(5.0, &tr), 0.5);
        assert_eq!(trapezoid(10.0, &tr), 1.0);
        assert_eq!(trapezoid(15.0, &tr), 1.0);
        assert_eq!(trapezoid(20.0, &tr), 1.0);
        assert_eq!(trapezoid(25.0, &tr), 0.5);
        assert_eq!(trapezoid(30.0, &tr), 0.0);
        assert_eq!(trapezoid(31.0, &tr), 0.0);
    }

    #[test]
    fn test_ramps_strictly_inside_unit_interval() {
        let tr = t(-1.0, 2.0, 4.0, 9.0);
        let mut x = -0.99_f32;
        while x < 9.0 {
            let v = trapezoid(x, &tr);
            if x < 2.0 || x > 4.0 {
                assert!(v > 0.0 && v < 1.0, "x={} v={}", x, v);
            } else {
                assert_eq!(v, 1.0);
            }
            x += 0.07;
        }
    }

    #[test]
    fn test_wide_ramp_stays_below_one() {
        let tr = t(-1.0, 16_777_216.0, 16_777_218.0, 16_777_220.0);
        let v = trapezoid(16_777_215.0, &tr);
        assert!(v < 1.0, "v={}", v);
        assert!(v > 0.999);

        let falling = t(-16_777_220.0, -16_777_218.0, -16_777_216.0, 1.0);
        let v = trapezoid(-16_777_215.0, &falling);
        assert!(v < 1.0 && v > 0.999, "v={}", v);
    }

    #[test]
    fn test_continuity_at_corners() {
        let tr = t(0.0, 10.0, 20.0, 30.0);
        let eps = 1e-3_f32;
        for corner in [0.0_f32, 10.0, 20.0, 30.0] {
            let left = trapezoid(corner - eps, &tr);
            let at = trapezoid(corner, &tr);
            let right = trapezoid(corner + eps, &tr);
            assert!((left - at).abs() < 1e-3, "left jump at {}", corner);
            assert!((right - at).abs() < 1e-3, "right jump at {}", corner);
        }
    }

    #[test]
    fn test_degenerate_ramps() {
        let left_step = t(5.0, 5.0, 10.0, 12.0);
        assert_eq!(trapezoid(5.0, &left_step), 1.0);
        assert_eq!(trapezoid(4.999, &left_step), 0.0);

        let right_step = t(0.0, 2.0, 7.0, 7.0);
        assert_eq!(trapezoid(7.0, &right_step), 1.0);
        assert_eq!(trapezoid(7.001, &right_step), 0.0);

        let spike = t(3.0, 3.0, 3.0, 3.0);
        assert_eq!(trapezoid(3.0, &spike), 1.0);
        assert_eq!(trapezoid(2.0, &spike), 0.0);
        assert_eq!(trapezoid(4.0, &spike), 0.0);

        for x in [-1.0_f32, 3.0, 5.0, 7.0, 12.0] {
            for tr in [left_step, right_step, spike] {
                assert!(trapezoid(x, &tr).is_finite());
            }
        }
    }

    #[test]
    fn test_nan_propagation() {
        let tr = t(0.0, 1.0, 2.0, 3.0);
        assert!(trapezoid(f32::NAN, &tr).is_nan());
        assert!(trapezoid(1.5, &t(0.0, f32::NAN, 2.0, 3.0)).is_nan());
        assert!(trapezoid(1.5, &Trapezoid::nan()).is_nan());
    }

    #[test]
    fn test_fuzzify_cube() {
        // 2 bins, 1 class, 2 observables
        let corners = CornerCube {
            num_bins: 2,
            num_classes: 1,
            num_observables: 2,
            data: vec![
                0.0, 10.0, 20.0, 30.0, 0.0, 1.0, 1.0, 2.0, // bin 0
                0.0, 10.0, 20.0, 30.0, f32::NAN, f32::NAN, f32::NAN, f32::NAN, // bin 1
            ],
        };
        let zh = [5.0_f32, 15.0];
        let zdr = [1.5_f32, 1.0];
        let degrees = fuzzify(&corners, &[&zh, &zdr]).unwrap();
        assert_eq!(degrees.get(0, 0, 0), Some(0.5));
        assert_eq!(degrees.get(0, 0, 1), Some(0.5));
        assert_eq!(degrees.get(1, 0, 0), Some(1.0));
        assert!(degrees.get(1, 0, 1).unwrap().is_nan());
    }

    #[test]
    fn test_fuzzify_checks_inputs() {
        let corners = CornerCube {
            num_bins: 2,
            num_classes: 1,
            num_observables: 1,
            data: vec![0.0, 1.0, 2.0, 3.0, 0.0, 1.0, 2.0, 3.0],
        };
        let short = [1.0_f32];
        assert!(matches!(
            fuzzify(&corners, &[&short]),
            Err(HydroError::ShapeMismatch { .. })
        ));
        let ok = [1.0_f32, 2.0];
        assert!(fuzzify(&corners, &[&ok, &ok]).is_err());
    }

    #[test]
    fn test_chunk_size_independent() {
        let num_bins = 50;
        let mut data = Vec::new();
        for i in 0..num_bins {
            let base = i as f32 * 0.1;
            data.extend_from_slice(&[base, base + 1.0, base + 2.0, base + 4.0]);
        }
        let corners = CornerCube { num_bins, num_classes: 1, num_observables: 1, data };
        let obs: Vec<f32> = (0..num_bins).map(|i| (i % 7) as f32 * 0.8).collect();

        let a = fuzzify_chunked(&corners, &[&obs], 1).unwrap();
        let b = fuzzify_chunked(&corners, &[&obs], 64).unwrap();
        let bits_a: Vec<u32> = a.data.iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = b.data.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }
}
