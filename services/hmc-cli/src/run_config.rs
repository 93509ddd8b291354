//! Run configuration for the `hmc` command.
//!
//! A run file is YAML:
//!
//! ```yaml
//! table:
//!   path: ${HMC_TABLE_DIR:-/etc/hmc}/msf_cband.json
//! classifier:
//!   independent_field: DBZH
//!   threshold: 0.5
//!   bindings:
//!     - { field: DBZH, table_key: zh, weight: 2.0 }
//!     - { field: ZDR, table_key: zdr }
//! output:
//!   include_probabilities: true
//! ```
//!
//! Supports environment variable substitution using ${VAR} and
//! ${VAR:-default} syntax.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fuzzy_classifier::{ClassifierConfig, TableFile, TableFormat};
use hydro_common::HydrometeorRegistry;
use serde::{Deserialize, Serialize};

/// Everything a classification run needs besides the input fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Membership table; may be overridden on the command line.
    pub table: Option<TableConfig>,

    /// Class catalogue; the standard 11-class registry when absent.
    pub registry: Option<HydrometeorRegistry>,

    pub classifier: ClassifierConfig,

    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub path: PathBuf,
    /// Taken from the file extension when absent.
    #[serde(default)]
    pub format: Option<TableFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Add per-class probability fields to the report.
    pub include_probabilities: bool,
    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            include_probabilities: false,
            pretty: true,
        }
    }
}

impl RunConfig {
    /// Configuration without a run file: classifier settings from `HMC_*`
    /// environment variables, everything else default.
    pub fn from_env() -> Self {
        Self {
            classifier: ClassifierConfig::from_env(),
            ..Self::default()
        }
    }

    /// The registry to classify with.
    pub fn registry(&self) -> HydrometeorRegistry {
        self.registry.clone().unwrap_or_default()
    }

    /// Table file to load; `override_path` wins over the configured table.
    pub fn table_file(&self, override_path: Option<&Path>) -> Result<TableFile> {
        match (override_path, &self.table) {
            (Some(path), _) => Ok(TableFile::new(path)),
            (None, Some(TableConfig { path, format: Some(format) })) => {
                Ok(TableFile::with_format(path, *format))
            }
            (None, Some(TableConfig { path, format: None })) => Ok(TableFile::new(path)),
            (None, None) => anyhow::bail!(
                "No membership table given: pass --table or set `table.path` in the run config"
            ),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate a run file with environment variable substitution.
pub fn load_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read run config from {:?}", path.as_ref()))?;

    parse_run_config(&content)
        .with_context(|| format!("Invalid run config {:?}", path.as_ref()))
}

/// Parse and validate run-file YAML.
pub fn parse_run_config(content: &str) -> Result<RunConfig> {
    let expanded = expand_env_vars(content)?;

    // An empty document means "all defaults".
    let config: RunConfig = if expanded.trim().is_empty() {
        RunConfig::default()
    } else {
        serde_yaml::from_str(&expanded).context("Failed to parse run config YAML")?
    };

    validate_run_config(&config)?;
    Ok(config)
}

fn validate_run_config(config: &RunConfig) -> Result<()> {
    if let Some(table) = &config.table {
        anyhow::ensure!(
            !table.path.as_os_str().is_empty(),
            "table.path cannot be empty"
        );
    }
    config
        .classifier
        .validate()
        .context("Invalid classifier settings")?;
    Ok(())
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuzzy_classifier::{IndexMethod, ThresholdFill};

    #[test]
    fn test_expand_env_vars_simple() {
        std::env::set_var("HMC_TEST_TABLE_DIR", "/data/tables");
        let result = expand_env_vars("path: ${HMC_TEST_TABLE_DIR}/x.json").unwrap();
        assert_eq!(result, "path: /data/tables/x.json");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        std::env::remove_var("HMC_TEST_UNSET");
        let result = expand_env_vars("threshold: ${HMC_TEST_UNSET:-0.4}").unwrap();
        assert_eq!(result, "threshold: 0.4");
    }

    #[test]
    fn test_expand_env_vars_errors() {
        std::env::remove_var("HMC_TEST_REQUIRED");
        assert!(expand_env_vars("${HMC_TEST_REQUIRED}").is_err());
        assert!(expand_env_vars("${HMC_TEST_REQUIRED").is_err());
    }

    #[test]
    fn test_plain_dollar_untouched() {
        assert_eq!(expand_env_vars("cost: $5").unwrap(), "cost: $5");
    }

    #[test]
    fn test_parse_full_run_config() {
        let config = parse_run_config(
            r#"
table:
  path: tables/msf.txt
  format: text
registry:
  classes:
    - { code: RA, label: Rain }
    - { code: HA, label: Hail }
classifier:
  independent_field: DBZH
  threshold: 0.5
  threshold_fill: nan
  index_method: linear
  bindings:
    - { field: DBZH, table_key: zh, weight: 2.0 }
    - { field: ZDR, table_key: zdr }
output:
  include_probabilities: true
"#,
        )
        .unwrap();

        assert_eq!(config.registry().len(), 2);
        assert_eq!(config.classifier.independent_field, "DBZH");
        assert_eq!(config.classifier.threshold_fill, ThresholdFill::Nan);
        assert_eq!(config.classifier.index_method, IndexMethod::Linear);
        assert_eq!(config.classifier.weights(), vec![2.0, 1.0]);
        assert!(config.output.include_probabilities);
        assert!(config.output.pretty);

        let table = config.table_file(None).unwrap();
        assert_eq!(table.format, TableFormat::Text);
        let overridden = config.table_file(Some(Path::new("other.json"))).unwrap();
        assert_eq!(overridden.format, TableFormat::Json);
    }

    #[test]
    fn test_empty_run_config_is_default() {
        let config = parse_run_config("").unwrap();
        assert_eq!(config.registry().len(), 11);
        assert!(config.table_file(None).is_err());
    }

    #[test]
    fn test_invalid_classifier_settings_rejected() {
        assert!(parse_run_config("classifier:\n  threshold: 2.0\n").is_err());
        assert!(parse_run_config("registry:\n  classes: []\n").is_err());
    }
}
