//! Serializable run and table reports.

use anyhow::Result;
use chrono::{DateTime, Utc};
use fuzzy_classifier::{
    ClassDecision, ClassificationOutput, HydrometeorClassifier, IndexMethod, MembershipTable,
    ThresholdFill,
};
use hydro_common::{BinShape, Field, HydrometeorRegistry};
use serde::{Deserialize, Serialize};

/// Bin count of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassCount {
    pub index: usize,
    pub code: String,
    pub label: String,
    pub bins: usize,
}

/// Result of one `hmc classify` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub generated_at: DateTime<Utc>,
    /// Origin of the membership table.
    pub table: String,
    pub shape: BinShape,
    pub threshold: f32,
    pub threshold_fill: ThresholdFill,
    pub index_method: IndexMethod,
    pub classes: Vec<ClassCount>,
    pub unclassified: usize,
    pub classified_fraction: f64,
    /// Code of the class with the most bins.
    pub dominant: Option<String>,
    /// Class index per bin, -1 where unclassified.
    pub decisions: Vec<ClassDecision>,
    /// Thresholded probability per class, one field per class code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<Field>>,
}

impl ClassificationReport {
    pub fn new(
        classifier: &HydrometeorClassifier,
        output: &ClassificationOutput,
        table: impl Into<String>,
        include_probabilities: bool,
    ) -> Result<Self> {
        let registry = classifier.registry();
        let config = classifier.config();
        let summary = &output.summary;
        let shape = output.result.shape.clone();

        let classes = registry
            .iter()
            .map(|(index, class)| ClassCount {
                index,
                code: class.code.clone(),
                label: class.label.clone(),
                bins: summary.counts.get(index).copied().unwrap_or(0),
            })
            .collect();

        let probabilities = if include_probabilities {
            let fields = registry
                .iter()
                .map(|(index, class)| {
                    Field::new(
                        class.code.clone(),
                        shape.clone(),
                        output.thresholded.class_field(index),
                    )
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(fields)
        } else {
            None
        };

        Ok(Self {
            generated_at: Utc::now(),
            table: table.into(),
            shape,
            threshold: config.threshold,
            threshold_fill: config.threshold_fill,
            index_method: config.index_method,
            classes,
            unclassified: summary.unclassified,
            classified_fraction: summary.classified_fraction(),
            dominant: summary
                .dominant()
                .and_then(|i| registry.get(i))
                .map(|c| c.code.clone()),
            decisions: output.result.decisions.clone(),
            probabilities,
        })
    }

    /// One line per class with its share of the bins.
    pub fn render_summary(&self) -> String {
        let total = self.decisions.len().max(1) as f64;
        let mut out = format!(
            "{} bins ({}), {:.1}% classified\n",
            self.decisions.len(),
            self.shape,
            self.classified_fraction * 100.0
        );
        for class in &self.classes {
            out.push_str(&format!(
                "  {:>3} {:<4} {:<26} {:>8} {:>6.1}%\n",
                class.index,
                class.code,
                class.label,
                class.bins,
                class.bins as f64 / total * 100.0
            ));
        }
        out.push_str(&format!(
            "   -1 --   {:<26} {:>8} {:>6.1}%\n",
            "Unclassified",
            self.unclassified,
            self.unclassified as f64 / total * 100.0
        ));
        out
    }
}

/// Description of a membership table, for `hmc inspect-table`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub source: String,
    pub classes: Vec<String>,
    pub observables: Vec<String>,
    pub idp: Vec<f32>,
    pub entries: usize,
}

impl TableReport {
    pub fn new(table: &MembershipTable, source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            classes: table.class_codes().to_vec(),
            observables: table.observables().to_vec(),
            idp: table.idp_axis().values().to_vec(),
            entries: table.num_classes() * table.num_observables() * table.idp_axis().len(),
        }
    }
}

/// Registry listing, for `hmc classes`.
pub fn render_registry(registry: &HydrometeorRegistry) -> String {
    let mut out = String::new();
    for (index, class) in registry.iter() {
        out.push_str(&format!("{:>3} {:<4} {}\n", index, class.code, class.label));
    }
    out
}
