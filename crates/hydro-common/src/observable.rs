//! Radar observables and their bindings to membership-table keys.

use serde::{Deserialize, Serialize};

/// Well-known polarimetric observables and the temperature covariate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservableKind {
    /// Horizontal reflectivity (dBZ)
    #[serde(rename = "zh")]
    Reflectivity,
    /// Differential reflectivity (dB)
    #[serde(rename = "zdr")]
    DifferentialReflectivity,
    /// Co-polar cross-correlation coefficient (unitless)
    #[serde(rename = "rho")]
    CorrelationCoefficient,
    /// Specific differential phase (deg/km)
    #[serde(rename = "kdp")]
    SpecificDifferentialPhase,
    /// Air temperature at bin height (degC), merged in from soundings
    #[serde(rename = "tmp")]
    Temperature,
}

impl ObservableKind {
    /// All kinds, in the conventional table order.
    pub const ALL: [ObservableKind; 5] = [
        ObservableKind::Reflectivity,
        ObservableKind::DifferentialReflectivity,
        ObservableKind::CorrelationCoefficient,
        ObservableKind::SpecificDifferentialPhase,
        ObservableKind::Temperature,
    ];

    /// Membership-table key for this observable.
    pub fn table_key(&self) -> &'static str {
        match self {
            Self::Reflectivity => "zh",
            Self::DifferentialReflectivity => "zdr",
            Self::CorrelationCoefficient => "rho",
            Self::SpecificDifferentialPhase => "kdp",
            Self::Temperature => "tmp",
        }
    }

    /// Physical units.
    pub fn units(&self) -> &'static str {
        match self {
            Self::Reflectivity => "dBZ",
            Self::DifferentialReflectivity => "dB",
            Self::CorrelationCoefficient => "1",
            Self::SpecificDifferentialPhase => "deg/km",
            Self::Temperature => "degC",
        }
    }

    /// Parse from a table key or common alias (case-insensitive).
    pub fn from_key(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "zh" | "dbzh" | "reflectivity" => Some(Self::Reflectivity),
            "zdr" | "differential_reflectivity" => Some(Self::DifferentialReflectivity),
            "rho" | "rhohv" | "cross_correlation_ratio" => Some(Self::CorrelationCoefficient),
            "kdp" | "specific_differential_phase" => Some(Self::SpecificDifferentialPhase),
            "tmp" | "temp" | "temperature" => Some(Self::Temperature),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObservableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.table_key())
    }
}

/// Maps a named input field onto a membership-table observable with a weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservableBinding {
    /// Name of the field supplied by the field provider (e.g. "DBZH")
    pub field: String,
    /// Observable key in the membership table (e.g. "zh")
    pub table_key: String,
    /// Non-negative aggregation weight; 0 disables the observable
    #[serde(default = "default_weight")]
    pub weight: f32,
}

fn default_weight() -> f32 {
    1.0
}

impl ObservableBinding {
    pub fn new(field: impl Into<String>, table_key: impl Into<String>, weight: f32) -> Self {
        Self {
            field: field.into(),
            table_key: table_key.into(),
            weight,
        }
    }

    /// Binding whose field name equals the table key of a known observable.
    pub fn for_kind(kind: ObservableKind, weight: f32) -> Self {
        Self::new(kind.table_key(), kind.table_key(), weight)
    }
}

/// Unit-weight bindings for all five standard observables, field names equal
/// to table keys.
pub fn standard_bindings() -> Vec<ObservableBinding> {
    ObservableKind::ALL
        .iter()
        .map(|kind| ObservableBinding::for_kind(*kind, 1.0))
        .collect()
}
