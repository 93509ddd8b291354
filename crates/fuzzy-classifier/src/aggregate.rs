//! Probability aggregation.
//!
//! Per (bin, class) the probability is the weighted mean of the membership
//! degrees over the observable axis:
//!
//! ```text
//! p = Σ w_o · deg_o / Σ w_o      over observables with deg_o not NaN
//! ```
//!
//! Missing-data policy: an observable whose degree is NaN for a bin is
//! dropped from both sums for that bin only, so a gap in one field lowers
//! the evidence count instead of wiping out the bin. When every weighted
//! observable is NaN the probability is NaN. A zero weight removes the
//! observable everywhere, including from the "all NaN" test.

use hydro_common::{HydroError, HydroResult};
use rayon::prelude::*;

use crate::indexer::DEFAULT_BINS_PER_TASK;
use crate::types::{DegreeCube, ProbabilityGrid};

/// Check that weights are finite, non-negative and not all zero.
pub fn validate_weights(weights: &[f32]) -> HydroResult<()> {
    if weights.is_empty() {
        return Err(HydroError::configuration("at least one observable weight is required"));
    }
    if let Some((i, w)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(HydroError::invalid_parameter(
            format!("weights[{}]", i),
            format!("must be finite and non-negative, got {}", w),
        ));
    }
    if weights.iter().all(|w| *w == 0.0) {
        return Err(HydroError::configuration("all observable weights are zero"));
    }
    Ok(())
}

/// Combine membership degrees into one probability per (bin, class).
pub fn aggregate(degrees: &DegreeCube, weights: &[f32]) -> HydroResult<ProbabilityGrid> {
    aggregate_chunked(degrees, weights, DEFAULT_BINS_PER_TASK)
}

/// [`aggregate`] with an explicit parallel chunk size in bins.
pub fn aggregate_chunked(
    degrees: &DegreeCube,
    weights: &[f32],
    bins_per_task: usize,
) -> HydroResult<ProbabilityGrid> {
    if weights.len() != degrees.num_observables {
        return Err(HydroError::configuration(format!(
            "received {} weights for {} observables",
            weights.len(),
            degrees.num_observables
        )));
    }
    validate_weights(weights)?;

    let num_bins = degrees.num_bins;
    let num_classes = degrees.num_classes;
    let num_obs = degrees.num_observables;
    let in_stride = num_classes * num_obs;
    let mut data = vec![f32::NAN; num_bins * num_classes];

    if num_classes > 0 {
        let chunk_bins = bins_per_task.max(1);
        data.par_chunks_mut(chunk_bins * num_classes)
            .zip(degrees.data.par_chunks(chunk_bins * in_stride))
            .for_each(|(out, din)| {
                for (bin_out, bin_in) in out
                    .chunks_exact_mut(num_classes)
                    .zip(din.chunks_exact(in_stride))
                {
                    for (class, p) in bin_out.iter_mut().enumerate() {
                        *p = weighted_mean(&bin_in[class * num_obs..(class + 1) * num_obs], weights);
                    }
                }
            });
    }

    Ok(ProbabilityGrid {
        num_bins,
        num_classes,
        data,
    })
}

/// NaN-skipping weighted mean; accumulates in f64.
#[inline]
fn weighted_mean(degrees: &[f32], weights: &[f32]) -> f32 {
    let mut numerator = 0.0f64;
    let mut denominator = 0.0f64;
    for (&deg, &w) in degrees.iter().zip(weights) {
        if w == 0.0 || deg.is_nan() {
            continue;
        }
        numerator += w as f64 * deg as f64;
        denominator += w as f64;
    }
    if denominator == 0.0 {
        f32::NAN
    } else {
        (numerator / denominator) as f32
    }
}
