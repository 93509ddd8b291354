//! Command implementations, kept apart from argument parsing so they can be
//! driven from tests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fuzzy_classifier::{
    write_text_table, HydrometeorClassifier, MembershipTable, MembershipTableSource, TableDocument,
    TableFormat,
};
use hydro_common::HydrometeorRegistry;
use tracing::info;

use crate::fields::load_fields;
use crate::report::{ClassificationReport, TableReport};
use crate::run_config::{load_run_config, RunConfig};

/// Inputs of `hmc classify`.
#[derive(Debug, Clone, Default)]
pub struct ClassifyOptions {
    /// Overrides the run file's table.
    pub table: Option<PathBuf>,
    pub fields: PathBuf,
    /// Overrides the configured threshold.
    pub threshold: Option<f32>,
    /// Forces per-class probabilities into the report.
    pub probabilities: bool,
}

/// Resolve the run configuration for a command.
pub fn resolve_run_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => load_run_config(path),
        None => Ok(RunConfig::from_env()),
    }
}

/// Load a table and build a classifier, then classify one field file.
pub fn classify(run: &RunConfig, options: &ClassifyOptions) -> Result<ClassificationReport> {
    let mut run = run.clone();
    if let Some(threshold) = options.threshold {
        run.classifier.threshold = threshold;
    }
    if options.probabilities {
        run.output.include_probabilities = true;
    }

    let registry = run.registry();
    let source = run.table_file(options.table.as_deref())?;
    let table = source
        .load(&registry)
        .with_context(|| format!("Failed to load membership table {}", source.describe()))?;

    let classifier = HydrometeorClassifier::new(registry, table, run.classifier.clone())
        .context("Classifier setup failed")?;

    let fields = load_fields(&options.fields)?;
    let output = classifier
        .classify(&fields)
        .with_context(|| format!("Classification of {:?} failed", options.fields))?;

    ClassificationReport::new(
        &classifier,
        &output,
        source.describe(),
        run.output.include_probabilities,
    )
}

/// Serialize a report as JSON to a file, or to stdout when `path` is `None`.
pub fn write_report(report: &ClassificationReport, path: Option<&Path>, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };

    match path {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write report to {:?}", path))?;
            info!(path = %path.display(), bins = report.decisions.len(), "Wrote classification report");
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Load and validate a table; optionally convert it to another format.
pub fn inspect_table(
    run: &RunConfig,
    table_path: Option<&Path>,
    export: Option<&Path>,
) -> Result<TableReport> {
    let registry = run.registry();
    let source = run.table_file(table_path)?;
    let table = source
        .load(&registry)
        .with_context(|| format!("Failed to load membership table {}", source.describe()))?;

    if let Some(target) = export {
        export_table(&table, target)?;
    }

    Ok(TableReport::new(&table, source.describe()))
}

/// Write a table in the format implied by the target's extension.
pub fn export_table(table: &MembershipTable, target: &Path) -> Result<()> {
    let format = TableFormat::from_path(target);
    let contents = match format {
        TableFormat::Json => serde_json::to_string_pretty(&TableDocument::from_table(table))?,
        TableFormat::Yaml => serde_yaml::to_string(&TableDocument::from_table(table))?,
        TableFormat::Text => write_text_table(table),
    };
    fs::write(target, contents).with_context(|| format!("Failed to write table to {:?}", target))?;
    info!(path = %target.display(), format = ?format, "Exported membership table");
    Ok(())
}

/// Registry a command should use.
pub fn registry_for(config: Option<&Path>) -> Result<HydrometeorRegistry> {
    Ok(resolve_run_config(config)?.registry())
}
