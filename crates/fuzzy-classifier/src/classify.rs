//! Threshold and class decision.

use std::cmp::Ordering;

use hydro_common::{BinShape, HydroError, HydroResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::indexer::DEFAULT_BINS_PER_TASK;
use crate::types::{ClassDecision, ClassRanking, ClassificationResult, ProbabilityGrid};

/// Replacement for probabilities at or below the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdFill {
    #[default]
    Zero,
    Nan,
}

impl ThresholdFill {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "nan" | "missing" => Self::Nan,
            _ => Self::Zero,
        }
    }

    fn value(self) -> f32 {
        match self {
            Self::Zero => 0.0,
            Self::Nan => f32::NAN,
        }
    }
}

impl std::fmt::Display for ThresholdFill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zero => write!(f, "zero"),
            Self::Nan => write!(f, "nan"),
        }
    }
}

/// Check that a threshold lies in [0, 1].
pub fn validate_threshold(threshold: f32) -> HydroResult<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(HydroError::invalid_parameter(
            "threshold",
            format!("must be within [0, 1], got {}", threshold),
        ));
    }
    Ok(())
}

/// Replace every probability `<= threshold` with the fill value.
///
/// Values above the threshold are kept as-is (no renormalisation); NaN stays
/// NaN.
pub fn threshold(
    probabilities: &ProbabilityGrid,
    threshold: f32,
    fill: ThresholdFill,
) -> HydroResult<ProbabilityGrid> {
    validate_threshold(threshold)?;
    let fill_value = fill.value();

    let data: Vec<f32> = probabilities
        .data
        .par_iter()
        .with_min_len(DEFAULT_BINS_PER_TASK)
        .map(|&p| if p <= threshold { fill_value } else { p })
        .collect();

    Ok(ProbabilityGrid {
        num_bins: probabilities.num_bins,
        num_classes: probabilities.num_classes,
        data,
    })
}

/// Pick the most probable class of every bin.
///
/// Ties go to the lowest class index. A bin whose probabilities are all 0 or
/// NaN is [`ClassDecision::Unclassified`].
pub fn decide(probabilities: &ProbabilityGrid, shape: BinShape) -> HydroResult<ClassificationResult> {
    if shape.len() != probabilities.num_bins {
        return Err(HydroError::shape_mismatch(
            "probabilities",
            shape.dims(),
            &[probabilities.num_bins],
        ));
    }

    let num_classes = probabilities.num_classes;
    let decisions: Vec<ClassDecision> = if num_classes == 0 {
        vec![ClassDecision::Unclassified; probabilities.num_bins]
    } else {
        probabilities
            .data
            .par_chunks(num_classes)
            .with_min_len(DEFAULT_BINS_PER_TASK)
            .map(decide_bin)
            .collect()
    };

    Ok(ClassificationResult { shape, decisions })
}

/// Decision for one bin's class probabilities.
pub fn decide_bin(probabilities: &[f32]) -> ClassDecision {
    let mut best: Option<(usize, f32)> = None;
    for (class, &p) in probabilities.iter().enumerate() {
        if p.is_nan() || p <= 0.0 {
            continue;
        }
        match best {
            Some((_, best_p)) if p <= best_p => {}
            _ => best = Some((class, p)),
        }
    }
    match best {
        Some((class, _)) => ClassDecision::Class(class),
        None => ClassDecision::Unclassified,
    }
}

/// Order every bin's classes by descending probability.
///
/// NaN sorts last; equal probabilities keep ascending class order.
pub fn rank(probabilities: &ProbabilityGrid) -> ClassRanking {
    let num_bins = probabilities.num_bins;
    let num_classes = probabilities.num_classes;
    let mut order = vec![0usize; num_bins * num_classes];
    let mut values = vec![f32::NAN; num_bins * num_classes];

    if num_classes > 0 {
        order
            .par_chunks_mut(num_classes)
            .zip(values.par_chunks_mut(num_classes))
            .zip(probabilities.data.par_chunks(num_classes))
            .for_each(|((bin_order, bin_values), probs)| {
                let mut idx: Vec<usize> = (0..num_classes).collect();
                idx.sort_by(|&i, &j| descending_nan_last(probs[i], probs[j]));
                for (rank, &class) in idx.iter().enumerate() {
                    bin_order[rank] = class;
                    bin_values[rank] = probs[class];
                }
            });
    }

    ClassRanking {
        num_bins,
        num_classes,
        order,
        values,
    }
}

fn descending_nan_last(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(num_bins: usize, num_classes: usize, data: Vec<f32>) -> ProbabilityGrid {
        ProbabilityGrid::new(num_bins, num_classes, data).unwrap()
    }

    #[test]
    fn test_threshold_zero_fill() {
        let p = grid(1, 4, vec![0.2, 0.6, 0.61, f32::NAN]);
        let t = threshold(&p, 0.6, ThresholdFill::Zero).unwrap();
        assert_eq!(t.data[0], 0.0);
        assert_eq!(t.data[1], 0.0);
        assert_eq!(t.data[2], 0.61);
        assert!(t.data[3].is_nan());
    }

    #[test]
    fn test_threshold_nan_fill() {
        let p = grid(1, 3, vec![0.2, 0.9, 0.0]);
        let t = threshold(&p, 0.5, ThresholdFill::Nan).unwrap();
        assert!(t.data[0].is_nan());
        assert_eq!(t.data[1], 0.9);
        assert!(t.data[2].is_nan());
    }

    #[test]
    fn test_threshold_range_checked() {
        let p = grid(1, 1, vec![0.5]);
        assert!(threshold(&p, -0.1, ThresholdFill::Zero).is_err());
        assert!(threshold(&p, 1.5, ThresholdFill::Zero).is_err());
        assert!(threshold(&p, f32::NAN, ThresholdFill::Zero).is_err());
        assert!(threshold(&p, 1.0, ThresholdFill::Zero).is_ok());
    }

    #[test]
    fn test_decide_argmax_and_ties() {
        assert_eq!(decide_bin(&[0.1, 0.7, 0.3]), ClassDecision::Class(1));
        assert_eq!(decide_bin(&[0.5, 0.9, 0.9]), ClassDecision::Class(1));
        assert_eq!(decide_bin(&[f32::NAN, 0.2, f32::NAN]), ClassDecision::Class(1));
    }

    #[test]
    fn test_decide_sentinel() {
        assert_eq!(decide_bin(&[0.0, 0.0, 0.0]), ClassDecision::Unclassified);
        assert_eq!(decide_bin(&[f32::NAN, f32::NAN]), ClassDecision::Unclassified);
        assert_eq!(decide_bin(&[0.0, f32::NAN]), ClassDecision::Unclassified);
        assert_eq!(decide_bin(&[]), ClassDecision::Unclassified);
    }

    #[test]
    fn test_decide_never_picks_thresholded_class() {
        let p = grid(3, 3, vec![
            0.3, 0.45, 0.2, // all <= 0.5
            0.55, 0.5, 0.9, //
            f32::NAN, 0.51, 0.5,
        ]);
        let t = threshold(&p, 0.5, ThresholdFill::Zero).unwrap();
        let result = decide(&t, BinShape::flat(3)).unwrap();
        assert_eq!(result.decisions, vec![
            ClassDecision::Unclassified,
            ClassDecision::Class(2),
            ClassDecision::Class(1),
        ]);
        for (bin, d) in result.decisions.iter().enumerate() {
            if let Some(class) = d.class_index() {
                assert!(p.get(bin, class).unwrap() > 0.5);
            }
        }
    }

    #[test]
    fn test_decide_shape_checked() {
        let p = grid(2, 1, vec![0.5, 0.5]);
        assert!(decide(&p, BinShape::flat(3)).is_err());
        let r = decide(&p, BinShape::new(vec![1, 2])).unwrap();
        assert_eq!(r.shape.dims(), &[1, 2]);
    }

    #[test]
    fn test_rank_orders_descending_nan_last() {
        let p = grid(2, 4, vec![
            0.2, f32::NAN, 0.8, 0.2,
            0.0, 0.0, 0.0, 0.0,
        ]);
        let r = rank(&p);
        assert_eq!(r.bin_order(0), &[2, 0, 3, 1]);
        assert_eq!(&r.bin_values(0)[..3], &[0.8, 0.2, 0.2]);
        assert!(r.bin_values(0)[3].is_nan());
        assert_eq!(r.bin_order(1), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_fill_from_str() {
        assert_eq!(ThresholdFill::from_str("NaN"), ThresholdFill::Nan);
        assert_eq!(ThresholdFill::from_str("zero"), ThresholdFill::Zero);
        assert_eq!(ThresholdFill::from_str("other"), ThresholdFill::Zero);
    }
}
