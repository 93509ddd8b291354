//! Core types for fuzzy classification.
//!
//! Every intermediate array is a flat row-major `Vec<f32>` with the bin axis
//! outermost, so each stage can be partitioned by contiguous bin ranges.

use hydro_common::{BinShape, HydrometeorRegistry};
use serde::{Deserialize, Serialize};

/// Number of corners in a trapezoid.
pub const CORNERS: usize = 4;

/// Trapezoid corner set `a <= b <= c <= d`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trapezoid {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
}

impl Trapezoid {
    pub fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    /// All four corners set to NaN.
    pub fn nan() -> Self {
        Self::new(f32::NAN, f32::NAN, f32::NAN, f32::NAN)
    }

    pub fn from_slice(corners: &[f32]) -> Self {
        Self::new(corners[0], corners[1], corners[2], corners[3])
    }

    pub fn to_array(self) -> [f32; CORNERS] {
        [self.a, self.b, self.c, self.d]
    }

    /// Check if any corner is NaN.
    pub fn has_nan(&self) -> bool {
        self.a.is_nan() || self.b.is_nan() || self.c.is_nan() || self.d.is_nan()
    }

    /// Check that all corners are finite and non-decreasing.
    pub fn is_valid(&self) -> bool {
        let finite = self.a.is_finite() && self.b.is_finite() && self.c.is_finite() && self.d.is_finite();
        finite && self.a <= self.b && self.b <= self.c && self.c <= self.d
    }
}

impl From<[f32; CORNERS]> for Trapezoid {
    fn from(c: [f32; CORNERS]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

/// Method used to resolve a value onto the independent-observable axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMethod {
    /// Corners of the nearest idp bin (exact values, step changes).
    #[default]
    Nearest,
    /// Corners interpolated between the two bracketing idp bins.
    Linear,
}

impl IndexMethod {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "linear" | "interpolate" | "interpolated" => Self::Linear,
            _ => Self::Nearest,
        }
    }
}

impl std::fmt::Display for IndexMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Linear => write!(f, "linear"),
        }
    }
}

/// Per-bin corner sets, laid out `[bin][class][observable][corner]`.
#[derive(Debug, Clone)]
pub struct CornerCube {
    pub num_bins: usize,
    pub num_classes: usize,
    pub num_observables: usize,
    pub data: Vec<f32>,
}

impl CornerCube {
    /// Values per bin.
    pub fn bin_stride(&self) -> usize {
        self.num_classes * self.num_observables * CORNERS
    }

    /// Corner set for one (bin, class, observable).
    pub fn corners(&self, bin: usize, class: usize, observable: usize) -> Option<Trapezoid> {
        if bin >= self.num_bins || class >= self.num_classes || observable >= self.num_observables {
            return None;
        }
        let start = bin * self.bin_stride() + (class * self.num_observables + observable) * CORNERS;
        Some(Trapezoid::from_slice(&self.data[start..start + CORNERS]))
    }
}

/// Membership degrees, laid out `[bin][class][observable]`.
#[derive(Debug, Clone)]
pub struct DegreeCube {
    pub num_bins: usize,
    pub num_classes: usize,
    pub num_observables: usize,
    pub data: Vec<f32>,
}

impl DegreeCube {
    pub fn bin_stride(&self) -> usize {
        self.num_classes * self.num_observables
    }

    pub fn get(&self, bin: usize, class: usize, observable: usize) -> Option<f32> {
        if bin >= self.num_bins || class >= self.num_classes || observable >= self.num_observables {
            return None;
        }
        self.data
            .get(bin * self.bin_stride() + class * self.num_observables + observable)
            .copied()
    }
}

/// Class probabilities, laid out `[bin][class]`.
#[derive(Debug, Clone)]
pub struct ProbabilityGrid {
    pub num_bins: usize,
    pub num_classes: usize,
    pub data: Vec<f32>,
}

impl ProbabilityGrid {
    /// Build a grid from raw data, checking the length.
    pub fn new(num_bins: usize, num_classes: usize, data: Vec<f32>) -> Option<Self> {
        if data.len() != num_bins * num_classes {
            return None;
        }
        Some(Self {
            num_bins,
            num_classes,
            data,
        })
    }

    pub fn get(&self, bin: usize, class: usize) -> Option<f32> {
        if bin >= self.num_bins || class >= self.num_classes {
            return None;
        }
        self.data.get(bin * self.num_classes + class).copied()
    }

    /// All class probabilities of one bin.
    pub fn bin(&self, bin: usize) -> &[f32] {
        let start = bin * self.num_classes;
        &self.data[start..start + self.num_classes]
    }

    /// Probability field of one class across all bins.
    pub fn class_field(&self, class: usize) -> Vec<f32> {
        (0..self.num_bins)
            .map(|bin| self.data[bin * self.num_classes + class])
            .collect()
    }
}

/// Outcome of the class decision for one bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassDecision {
    /// Winning class, as a registry index.
    Class(usize),
    /// No class has positive probability (no precipitation, or no data).
    Unclassified,
}

impl ClassDecision {
    /// Integer encoding used in serialized output: class index or -1.
    pub fn to_code(self) -> i32 {
        match self {
            ClassDecision::Class(i) => i as i32,
            ClassDecision::Unclassified => -1,
        }
    }

    pub fn from_code(code: i32) -> Self {
        if code < 0 {
            ClassDecision::Unclassified
        } else {
            ClassDecision::Class(code as usize)
        }
    }

    pub fn class_index(self) -> Option<usize> {
        match self {
            ClassDecision::Class(i) => Some(i),
            ClassDecision::Unclassified => None,
        }
    }
}

impl Serialize for ClassDecision {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.to_code())
    }
}

impl<'de> Deserialize<'de> for ClassDecision {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(ClassDecision::from_code(i32::deserialize(deserializer)?))
    }
}

/// One decision per bin over the run's bin-index space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub shape: BinShape,
    pub decisions: Vec<ClassDecision>,
}

impl ClassificationResult {
    /// Integer codes (class index or -1) per bin.
    pub fn codes(&self) -> Vec<i32> {
        self.decisions.iter().map(|d| d.to_code()).collect()
    }

    /// Class codes per bin, `None` for unclassified bins.
    pub fn labels<'a>(&self, registry: &'a HydrometeorRegistry) -> Vec<Option<&'a str>> {
        self.decisions
            .iter()
            .map(|d| {
                d.class_index()
                    .and_then(|i| registry.get(i))
                    .map(|c| c.code.as_str())
            })
            .collect()
    }

    /// Count bins per class.
    pub fn summary(&self, num_classes: usize) -> ClassificationSummary {
        let mut counts = vec![0usize; num_classes];
        let mut unclassified = 0usize;
        for decision in &self.decisions {
            match decision {
                ClassDecision::Class(i) if *i < num_classes => counts[*i] += 1,
                _ => unclassified += 1,
            }
        }
        ClassificationSummary {
            counts,
            unclassified,
            total: self.decisions.len(),
        }
    }
}

/// Per-class bin counts for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationSummary {
    pub counts: Vec<usize>,
    pub unclassified: usize,
    pub total: usize,
}

impl ClassificationSummary {
    /// Class with the most bins; ties go to the lower index.
    pub fn dominant(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (i, &count) in self.counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((i, count)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Fraction of bins that received a class (0.0 - 1.0).
    pub fn classified_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.total - self.unclassified) as f64 / self.total as f64
        }
    }
}

/// Classes of every bin ordered by descending probability.
#[derive(Debug, Clone)]
pub struct ClassRanking {
    pub num_bins: usize,
    pub num_classes: usize,
    /// Class indices, `[bin][rank]`.
    pub order: Vec<usize>,
    /// Probabilities matching `order`, `[bin][rank]`.
    pub values: Vec<f32>,
}

impl ClassRanking {
    /// Ranked class indices of one bin.
    pub fn bin_order(&self, bin: usize) -> &[usize] {
        let start = bin * self.num_classes;
        &self.order[start..start + self.num_classes]
    }

    /// Ranked probabilities of one bin.
    pub fn bin_values(&self, bin: usize) -> &[f32] {
        let start = bin * self.num_classes;
        &self.values[start..start + self.num_classes]
    }
}
