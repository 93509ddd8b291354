//! Independent-observable indexing.
//!
//! Membership parameters vary with the measurement regime, expressed as bins
//! of one reference observable (usually reflectivity). For every radar bin
//! the indexer picks (or interpolates) the table row matching the bin's
//! reference value and gathers the corner sets of all classes and
//! observables into a [`CornerCube`].

use hydro_common::{HydroError, HydroResult};
use rayon::prelude::*;
use serde::Serialize;

use crate::table::MembershipTable;
use crate::types::{CornerCube, IndexMethod, CORNERS};

/// Default number of bins handed to one parallel task.
pub const DEFAULT_BINS_PER_TASK: usize = 4096;

/// Strictly increasing, finite centres of the independent-observable bins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdpAxis {
    centers: Vec<f32>,
}

/// Position of a value on the idp axis for linear lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub lower: usize,
    pub upper: usize,
    /// Weight of the upper bin (0.0 - 1.0).
    pub weight: f32,
}

impl IdpAxis {
    /// Create an axis, checking that centres are finite and strictly increasing.
    pub fn new(centers: Vec<f32>) -> HydroResult<Self> {
        if centers.is_empty() {
            return Err(HydroError::configuration(
                "independent-observable axis must have at least one bin",
            ));
        }
        if let Some(pos) = centers.iter().position(|c| !c.is_finite()) {
            return Err(HydroError::configuration(format!(
                "independent-observable axis value at index {} is not finite",
                pos
            )));
        }
        if let Some(pos) = centers.windows(2).position(|w| w[1] <= w[0]) {
            return Err(HydroError::configuration(format!(
                "independent-observable axis is not strictly increasing at index {} ({} -> {})",
                pos + 1,
                centers[pos],
                centers[pos + 1]
            )));
        }
        Ok(Self { centers })
    }

    /// Evenly spaced axis `start, start + step, ...` with `count` bins.
    pub fn uniform(start: f32, step: f32, count: usize) -> HydroResult<Self> {
        Self::new((0..count).map(|i| start + step * i as f32).collect())
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.centers
    }

    pub fn value(&self, bin: usize) -> Option<f32> {
        self.centers.get(bin).copied()
    }

    /// Index of an exact axis value (within a small tolerance).
    pub fn position_of(&self, value: f32) -> Option<usize> {
        let tolerance = 1e-4_f32.max(value.abs() * 1e-6);
        self.centers
            .iter()
            .position(|c| (c - value).abs() <= tolerance)
    }

    /// Nearest bin for a value; out-of-range values clamp to the edge bins.
    ///
    /// A value exactly halfway between two centres resolves to the lower bin.
    /// Returns `None` for NaN.
    pub fn nearest(&self, value: f32) -> Option<usize> {
        if value.is_nan() {
            return None;
        }
        let n = self.centers.len();
        if value <= self.centers[0] {
            return Some(0);
        }
        if value >= self.centers[n - 1] {
            return Some(n - 1);
        }

        // centers[upper - 1] < value <= centers[upper]
        let upper = self.centers.partition_point(|c| *c < value);
        let lower = upper - 1;
        if value - self.centers[lower] <= self.centers[upper] - value {
            Some(lower)
        } else {
            Some(upper)
        }
    }

    /// Bracketing bins and interpolation weight, clamped at the edges.
    ///
    /// Returns `None` for NaN.
    pub fn bracket(&self, value: f32) -> Option<Bracket> {
        if value.is_nan() {
            return None;
        }
        let n = self.centers.len();
        if value <= self.centers[0] {
            return Some(Bracket { lower: 0, upper: 0, weight: 0.0 });
        }
        if value >= self.centers[n - 1] {
            return Some(Bracket { lower: n - 1, upper: n - 1, weight: 0.0 });
        }

        let upper = self.centers.partition_point(|c| *c < value);
        let lower = upper - 1;
        let span = self.centers[upper] - self.centers[lower];
        let weight = ((value - self.centers[lower]) / span).clamp(0.0, 1.0);
        Some(Bracket { lower, upper, weight })
    }
}

/// Gather corner sets for every class and table observable.
pub fn select_corners(
    table: &MembershipTable,
    idp_values: &[f32],
    method: IndexMethod,
) -> CornerCube {
    let observables: Vec<usize> = (0..table.num_observables()).collect();
    select_corners_for(table, idp_values, &observables, method, DEFAULT_BINS_PER_TASK)
}

/// Gather corner sets for every class and a chosen list of table observables.
///
/// The observable axis of the returned cube follows `observables`, which
/// holds table observable indices. Bins with a NaN independent value get NaN
/// corners. Bins are processed in parallel chunks of `bins_per_task`.
pub fn select_corners_for(
    table: &MembershipTable,
    idp_values: &[f32],
    observables: &[usize],
    method: IndexMethod,
    bins_per_task: usize,
) -> CornerCube {
    let num_bins = idp_values.len();
    let num_classes = table.num_classes();
    let num_observables = observables.len();
    let stride = num_classes * num_observables * CORNERS;
    let mut data = vec![f32::NAN; num_bins * stride];

    if stride > 0 {
        let chunk_bins = bins_per_task.max(1);
        data.par_chunks_mut(chunk_bins * stride)
            .zip(idp_values.par_chunks(chunk_bins))
            .for_each(|(out, values)| {
                for (bin_out, &value) in out.chunks_exact_mut(stride).zip(values) {
                    fill_bin(table, value, observables, method, bin_out);
                }
            });
    }

    CornerCube {
        num_bins,
        num_classes,
        num_observables,
        data,
    }
}

/// Fill one bin's `[class][observable][corner]` block; leaves NaN when the
/// independent value is missing.
fn fill_bin(
    table: &MembershipTable,
    value: f32,
    observables: &[usize],
    method: IndexMethod,
    out: &mut [f32],
) {
    let num_observables = observables.len();
    match method {
        IndexMethod::Nearest => {
            let Some(idp) = table.idp_axis().nearest(value) else {
                return;
            };
            for class in 0..table.num_classes() {
                for (slot, &obs) in observables.iter().enumerate() {
                    let start = (class * num_observables + slot) * CORNERS;
                    out[start..start + CORNERS].copy_from_slice(table.corner_slice(class, obs, idp));
                }
            }
        }
        IndexMethod::Linear => {
            let Some(bracket) = table.idp_axis().bracket(value) else {
                return;
            };
            let w = bracket.weight;
            for class in 0..table.num_classes() {
                for (slot, &obs) in observables.iter().enumerate() {
                    let lo = table.corner_slice(class, obs, bracket.lower);
                    let hi = table.corner_slice(class, obs, bracket.upper);
                    let start = (class * num_observables + slot) * CORNERS;
                    for k in 0..CORNERS {
                        out[start + k] = lo[k] + (hi[k] - lo[k]) * w;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;
    use crate::types::Trapezoid;
    use hydro_common::{HydrometeorClass, HydrometeorRegistry};

    fn two_bin_table() -> MembershipTable {
        let registry = HydrometeorRegistry::new(vec![
            HydrometeorClass::new("LR", "Light Rain"),
            HydrometeorClass::new("HL", "Hail"),
        ])
        .unwrap();
        let axis = IdpAxis::new(vec![0.0, 10.0]).unwrap();
        let mut builder = TableBuilder::new(&registry, vec!["zdr".to_string()], axis).unwrap();
        builder.set("LR", "zdr", 0.0, Trapezoid::new(0.0, 1.0, 2.0, 3.0)).unwrap();
        builder.set("LR", "zdr", 10.0, Trapezoid::new(10.0, 11.0, 12.0, 13.0)).unwrap();
        builder.set("HL", "zdr", 0.0, Trapezoid::new(-1.0, 0.0, 0.0, 1.0)).unwrap();
        builder.set("HL", "zdr", 10.0, Trapezoid::new(-1.0, 0.0, 0.0, 1.0)).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_axis_validation() {
        assert!(IdpAxis::new(vec![]).is_err());
        assert!(IdpAxis::new(vec![0.0, 0.0]).is_err());
        assert!(IdpAxis::new(vec![0.0, f32::NAN]).is_err());
        assert!(IdpAxis::new(vec![5.0, 1.0]).is_err());
        assert_eq!(IdpAxis::uniform(-10.0, 5.0, 4).unwrap().values(), &[-10.0, -5.0, 0.0, 5.0]);
    }

    #[test]
    fn test_nearest_clamps_and_ties_low() {
        let axis = IdpAxis::new(vec![0.0, 10.0, 20.0]).unwrap();
        assert_eq!(axis.nearest(-50.0), Some(0));
        assert_eq!(axis.nearest(0.0), Some(0));
        assert_eq!(axis.nearest(4.9), Some(0));
        assert_eq!(axis.nearest(5.0), Some(0));
        assert_eq!(axis.nearest(5.1), Some(1));
        assert_eq!(axis.nearest(20.0), Some(2));
        assert_eq!(axis.nearest(99.0), Some(2));
        assert_eq!(axis.nearest(f32::NAN), None);
    }

    #[test]
    fn test_bracket_weights() {
        let axis = IdpAxis::new(vec![0.0, 10.0, 20.0]).unwrap();
        let b = axis.bracket(12.5).unwrap();
        assert_eq!((b.lower, b.upper), (1, 2));
        assert!((b.weight - 0.25).abs() < 1e-6);

        let edge = axis.bracket(-3.0).unwrap();
        assert_eq!((edge.lower, edge.upper, edge.weight), (0, 0, 0.0));
        let edge = axis.bracket(30.0).unwrap();
        assert_eq!((edge.lower, edge.upper, edge.weight), (2, 2, 0.0));
    }

    #[test]
    fn test_select_nearest() {
        let table = two_bin_table();
        let cube = select_corners(&table, &[2.0, 8.0, 100.0], IndexMethod::Nearest);
        assert_eq!(cube.num_bins, 3);
        assert_eq!(cube.num_classes, 2);
        assert_eq!(cube.num_observables, 1);
        assert_eq!(cube.corners(0, 0, 0), Some(Trapezoid::new(0.0, 1.0, 2.0, 3.0)));
        assert_eq!(cube.corners(1, 0, 0), Some(Trapezoid::new(10.0, 11.0, 12.0, 13.0)));
        assert_eq!(cube.corners(2, 0, 0), Some(Trapezoid::new(10.0, 11.0, 12.0, 13.0)));
        assert_eq!(cube.corners(0, 1, 0), Some(Trapezoid::new(-1.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_select_linear_interpolates() {
        let table = two_bin_table();
        let cube = select_corners(&table, &[5.0, -20.0], IndexMethod::Linear);
        let mid = cube.corners(0, 0, 0).unwrap();
        assert!((mid.a - 5.0).abs() < 1e-5);
        assert!((mid.d - 8.0).abs() < 1e-5);
        assert_eq!(cube.corners(1, 0, 0), Some(Trapezoid::new(0.0, 1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_nan_independent_value_propagates() {
        let table = two_bin_table();
        for method in [IndexMethod::Nearest, IndexMethod::Linear] {
            let cube = select_corners(&table, &[f32::NAN, 0.0], method);
            assert!(cube.corners(0, 0, 0).unwrap().has_nan());
            assert!(cube.corners(0, 1, 0).unwrap().has_nan());
            assert!(!cube.corners(1, 0, 0).unwrap().has_nan());
        }
    }

    #[test]
    fn test_chunking_does_not_change_result() {
        let table = two_bin_table();
        let values: Vec<f32> = (0..37).map(|i| i as f32 * 0.4 - 2.0).collect();
        let whole = select_corners_for(&table, &values, &[0], IndexMethod::Linear, 1000);
        let split = select_corners_for(&table, &values, &[0], IndexMethod::Linear, 3);
        let a: Vec<u32> = whole.data.iter().map(|v| v.to_bits()).collect();
        let b: Vec<u32> = split.data.iter().map(|v| v.to_bits()).collect();
        assert_eq!(a, b);
    }
}
