//! Configuration for the classification pipeline.

use hydro_common::{standard_bindings, HydroError, HydroResult, ObservableBinding};
use serde::{Deserialize, Serialize};

use crate::aggregate::validate_weights;
use crate::classify::{validate_threshold, ThresholdFill};
use crate::indexer::DEFAULT_BINS_PER_TASK;
use crate::types::IndexMethod;

/// Configuration for a classification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Field holding the independent observable (selects the idp row).
    pub independent_field: String,

    /// Field-to-table bindings with aggregation weights.
    pub bindings: Vec<ObservableBinding>,

    /// Probabilities at or below this value are discarded (0.0 - 1.0).
    pub threshold: f32,

    /// Replacement for discarded probabilities.
    pub threshold_fill: ThresholdFill,

    /// How the independent observable is resolved onto the idp axis.
    pub index_method: IndexMethod,

    /// Bins per parallel task.
    pub bins_per_task: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            independent_field: "zh".to_string(),
            bindings: standard_bindings(),
            threshold: 0.0,
            threshold_fill: ThresholdFill::Zero,
            index_method: IndexMethod::Nearest,
            bins_per_task: DEFAULT_BINS_PER_TASK,
        }
    }
}

impl ClassifierConfig {
    /// Load configuration from environment variables.
    ///
    /// Bindings are not read from the environment; they keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("HMC_INDEPENDENT_FIELD") {
            if !val.trim().is_empty() {
                config.independent_field = val;
            }
        }

        if let Ok(val) = std::env::var("HMC_THRESHOLD") {
            if let Ok(threshold) = val.parse() {
                config.threshold = threshold;
            }
        }

        if let Ok(val) = std::env::var("HMC_THRESHOLD_FILL") {
            config.threshold_fill = ThresholdFill::from_str(&val);
        }

        if let Ok(val) = std::env::var("HMC_INDEX_METHOD") {
            config.index_method = IndexMethod::from_str(&val);
        }

        if let Ok(val) = std::env::var("HMC_BINS_PER_TASK") {
            if let Ok(size) = val.parse() {
                config.bins_per_task = size;
            }
        }

        config
    }

    /// Builder-style binding replacement.
    pub fn with_bindings(mut self, bindings: Vec<ObservableBinding>) -> Self {
        self.bindings = bindings;
        self
    }

    /// Builder-style threshold.
    pub fn with_threshold(mut self, threshold: f32, fill: ThresholdFill) -> Self {
        self.threshold = threshold;
        self.threshold_fill = fill;
        self
    }

    /// Weights in binding order.
    pub fn weights(&self) -> Vec<f32> {
        self.bindings.iter().map(|b| b.weight).collect()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> HydroResult<()> {
        if self.independent_field.trim().is_empty() {
            return Err(HydroError::configuration("independent_field must not be empty"));
        }

        if self.bindings.is_empty() {
            return Err(HydroError::configuration("at least one observable binding is required"));
        }

        for (i, binding) in self.bindings.iter().enumerate() {
            if binding.field.trim().is_empty() || binding.table_key.trim().is_empty() {
                return Err(HydroError::configuration(format!(
                    "binding {} must name both a field and a table key",
                    i
                )));
            }
            if self.bindings[..i]
                .iter()
                .any(|b| b.table_key.eq_ignore_ascii_case(&binding.table_key))
            {
                return Err(HydroError::configuration(format!(
                    "table key '{}' is bound more than once",
                    binding.table_key
                )));
            }
        }

        validate_weights(&self.weights())?;
        validate_threshold(self.threshold)?;

        if self.bins_per_task == 0 {
            return Err(HydroError::invalid_parameter("bins_per_task", "must be > 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClassifierConfig::default();
        assert_eq!(config.independent_field, "zh");
        assert_eq!(config.bindings.len(), 5);
        assert_eq!(config.threshold, 0.0);
        assert_eq!(config.threshold_fill, ThresholdFill::Zero);
        assert_eq!(config.index_method, IndexMethod::Nearest);
        assert_eq!(config.bins_per_task, DEFAULT_BINS_PER_TASK);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClassifierConfig::default();
        config.threshold = 1.2;
        assert!(config.validate().is_err());

        config = ClassifierConfig::default();
        config.bins_per_task = 0;
        assert!(config.validate().is_err());

        config = ClassifierConfig::default();
        config.bindings.clear();
        assert!(config.validate().is_err());

        config = ClassifierConfig::default();
        config.bindings[1].weight = -0.5;
        assert!(config.validate().is_err());

        config = ClassifierConfig::default();
        for b in &mut config.bindings {
            b.weight = 0.0;
        }
        assert!(config.validate().is_err());

        config = ClassifierConfig::default();
        config.bindings.push(ObservableBinding::new("DBZH", "ZH", 1.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: ClassifierConfig = serde_yaml::from_str(
            "threshold: 0.4\nindex_method: linear\nbindings:\n  - field: DBZH\n    table_key: zh\n    weight: 2.0\n",
        )
        .unwrap();
        assert_eq!(config.threshold, 0.4);
        assert_eq!(config.index_method, IndexMethod::Linear);
        assert_eq!(config.independent_field, "zh");
        assert_eq!(config.weights(), vec![2.0]);
        assert!(config.validate().is_ok());
    }
}
