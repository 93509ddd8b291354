//! Error types for hydrometeor classification.

use thiserror::Error;

/// Result type alias using HydroError.
pub type HydroResult<T> = Result<T, HydroError>;

/// Primary error type for classification runs.
///
/// Every variant is fatal for the run that raised it. Missing or invalid
/// values inside otherwise valid fields are not errors: they surface as NaN
/// degrees/probabilities or as unclassified bins.
#[derive(Debug, Error)]
pub enum HydroError {
    // === Setup Errors ===
    /// Malformed membership table, registry or pipeline configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A field does not share the bin-index space of the run.
    #[error("shape mismatch for field '{field}': expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        field: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// A configured observable has no table entry or no field.
    #[error("missing observable '{name}' in {location}")]
    MissingObservable { name: String, location: String },

    #[error("invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // === Input Errors ===
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    // === Execution ===
    #[error("classification run cancelled before stage '{0}'")]
    Cancelled(&'static str),
}

impl HydroError {
    /// Create a Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(field: impl Into<String>, expected: &[usize], found: &[usize]) -> Self {
        Self::ShapeMismatch {
            field: field.into(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }

    /// Create a MissingObservable error.
    pub fn missing_observable(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self::MissingObservable {
            name: name.into(),
            location: location.into(),
        }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create a Parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Whether the error stems from setup (table, registry, bindings, shapes)
    /// rather than from reading inputs.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            HydroError::Configuration(_)
                | HydroError::ShapeMismatch { .. }
                | HydroError::MissingObservable { .. }
                | HydroError::InvalidParameter { .. }
        )
    }
}

// Conversion from common error types
impl From<std::io::Error> for HydroError {
    fn from(err: std::io::Error) -> Self {
        HydroError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for HydroError {
    fn from(err: serde_json::Error) -> Self {
        HydroError::Parse(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for HydroError {
    fn from(err: serde_yaml::Error) -> Self {
        HydroError::Parse(format!("YAML error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = HydroError::shape_mismatch("zdr", &[2, 360, 500], &[2, 360, 499]);
        let msg = err.to_string();
        assert!(msg.contains("zdr"));
        assert!(msg.contains("[2, 360, 500]"));
        assert!(msg.contains("[2, 360, 499]"));
    }

    #[test]
    fn test_setup_classification() {
        assert!(HydroError::configuration("bad").is_setup_error());
        assert!(HydroError::missing_observable("kdp", "fields").is_setup_error());
        assert!(!HydroError::Io("disk".to_string()).is_setup_error());
        assert!(!HydroError::Cancelled("fuzzify").is_setup_error());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: HydroError = io.into();
        assert!(matches!(err, HydroError::Io(_)));
    }
}
