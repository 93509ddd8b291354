//! Classification pipeline.
//!
//! ```text
//! FieldSet ──► plan() ── shape + binding checks
//!                │
//!                ▼
//!          ClassificationPlan::execute()
//!                │
//!                ├─► select_corners   (bin × class × obs × 4)
//!                ├─► fuzzify          (bin × class × obs)
//!                ├─► aggregate        (bin × class)
//!                ├─► threshold        (bin × class)
//!                └─► decide           (bin)
//! ```
//!
//! Every stage works bin by bin, so stages are split into parallel tasks of
//! `bins_per_task` bins and the output does not depend on the split.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use hydro_common::{BinShape, FieldSet, HydroError, HydroResult, HydrometeorRegistry};
use tracing::{debug, info, warn};

use crate::aggregate::aggregate_chunked;
use crate::classify::{decide, rank, threshold};
use crate::config::ClassifierConfig;
use crate::fuzzify::fuzzify_chunked;
use crate::indexer::select_corners_for;
use crate::table::MembershipTable;
use crate::types::{ClassRanking, ClassificationResult, ClassificationSummary, ProbabilityGrid};

/// Cooperative cancellation flag, checked between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A binding resolved against the table.
#[derive(Debug, Clone)]
struct ResolvedBinding {
    field: String,
    table_index: usize,
    weight: f32,
}

/// Fuzzy hydrometeor classifier: registry, table and configuration, checked
/// against each other once.
#[derive(Debug, Clone)]
pub struct HydrometeorClassifier {
    registry: HydrometeorRegistry,
    table: Arc<MembershipTable>,
    config: ClassifierConfig,
    bindings: Vec<ResolvedBinding>,
}

impl HydrometeorClassifier {
    /// Create a classifier.
    ///
    /// Fails when the configuration is invalid, the table was built for a
    /// different registry, or a binding names an observable the table lacks.
    pub fn new(
        registry: HydrometeorRegistry,
        table: impl Into<Arc<MembershipTable>>,
        config: ClassifierConfig,
    ) -> HydroResult<Self> {
        let table = table.into();
        config.validate()?;
        table.check_registry(&registry)?;

        let mut bindings = Vec::with_capacity(config.bindings.len());
        for binding in &config.bindings {
            let table_index = table
                .observable_index(&binding.table_key)
                .ok_or_else(|| HydroError::missing_observable(&binding.table_key, "membership table"))?;
            bindings.push(ResolvedBinding {
                field: binding.field.clone(),
                table_index,
                weight: binding.weight,
            });
        }

        let unused: Vec<&str> = table
            .observables()
            .iter()
            .enumerate()
            .filter(|(i, _)| !bindings.iter().any(|b| b.table_index == *i))
            .map(|(_, name)| name.as_str())
            .collect();
        if !unused.is_empty() {
            debug!(observables = ?unused, "Table observables without a binding are ignored");
        }

        info!(
            classes = registry.len(),
            observables = bindings.len(),
            idp_bins = table.idp_axis().len(),
            threshold = config.threshold,
            index_method = %config.index_method,
            "Hydrometeor classifier ready"
        );

        Ok(Self {
            registry,
            table,
            config,
            bindings,
        })
    }

    pub fn registry(&self) -> &HydrometeorRegistry {
        &self.registry
    }

    pub fn table(&self) -> &MembershipTable {
        &self.table
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Check the fields against the bindings and prepare a run.
    pub fn plan<'a>(&'a self, fields: &'a FieldSet) -> HydroResult<ClassificationPlan<'a>> {
        let shape = fields
            .shape()
            .cloned()
            .ok_or_else(|| HydroError::missing_observable(&self.config.independent_field, "input fields"))?;

        let independent = fields.require(&self.config.independent_field)?;
        check_shape(&independent.name, &shape, &independent.shape)?;

        let mut observations = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let field = fields.require(&binding.field)?;
            check_shape(&field.name, &shape, &field.shape)?;
            let missing = field.missing_count();
            if missing == field.len() && !field.is_empty() {
                warn!(field = %field.name, "Field has no valid bins");
            }
            observations.push(field.data.as_slice());
        }

        Ok(ClassificationPlan {
            classifier: self,
            shape,
            independent: independent.data.as_slice(),
            observations,
            cancel: None,
        })
    }

    /// Plan and execute in one call.
    pub fn classify(&self, fields: &FieldSet) -> HydroResult<ClassificationOutput> {
        self.plan(fields)?.execute()
    }
}

fn check_shape(name: &str, expected: &BinShape, found: &BinShape) -> HydroResult<()> {
    if expected != found {
        return Err(HydroError::shape_mismatch(name, expected.dims(), found.dims()));
    }
    Ok(())
}

/// A validated run, ready to execute.
#[derive(Debug)]
pub struct ClassificationPlan<'a> {
    classifier: &'a HydrometeorClassifier,
    shape: BinShape,
    independent: &'a [f32],
    observations: Vec<&'a [f32]>,
    cancel: Option<CancelToken>,
}

impl<'a> ClassificationPlan<'a> {
    /// Attach a cancellation token.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn shape(&self) -> &BinShape {
        &self.shape
    }

    fn checkpoint(&self, stage: &'static str) -> HydroResult<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => {
                warn!(stage, "Classification cancelled");
                Err(HydroError::Cancelled(stage))
            }
            _ => Ok(()),
        }
    }

    /// Run every stage.
    pub fn execute(&self) -> HydroResult<ClassificationOutput> {
        let classifier = self.classifier;
        let config = &classifier.config;
        let chunk = config.bins_per_task;
        let started = Instant::now();

        let table_indices: Vec<usize> = classifier.bindings.iter().map(|b| b.table_index).collect();
        let weights: Vec<f32> = classifier.bindings.iter().map(|b| b.weight).collect();

        self.checkpoint("select_corners")?;
        let corners = select_corners_for(
            &classifier.table,
            self.independent,
            &table_indices,
            config.index_method,
            chunk,
        );

        self.checkpoint("fuzzify")?;
        let degrees = fuzzify_chunked(&corners, &self.observations, chunk)?;
        drop(corners);

        self.checkpoint("aggregate")?;
        let probabilities = aggregate_chunked(&degrees, &weights, chunk)?;
        drop(degrees);

        self.checkpoint("threshold")?;
        let thresholded = threshold(&probabilities, config.threshold, config.threshold_fill)?;

        self.checkpoint("decide")?;
        let result = decide(&thresholded, self.shape.clone())?;
        let summary = result.summary(classifier.registry.len());

        let dominant = summary
            .dominant()
            .and_then(|i| classifier.registry.get(i))
            .map(|c| c.code.clone());
        info!(
            bins = self.shape.len(),
            shape = %self.shape,
            classified = summary.total - summary.unclassified,
            unclassified = summary.unclassified,
            dominant = ?dominant,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Classification complete"
        );

        Ok(ClassificationOutput {
            probabilities,
            thresholded,
            result,
            summary,
        })
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct ClassificationOutput {
    /// Aggregated probabilities before thresholding.
    pub probabilities: ProbabilityGrid,
    /// Probabilities after thresholding.
    pub thresholded: ProbabilityGrid,
    /// Winning class per bin.
    pub result: ClassificationResult,
    /// Bin counts per class.
    pub summary: ClassificationSummary,
}

impl ClassificationOutput {
    /// Classes of every bin ranked by thresholded probability.
    pub fn ranking(&self) -> ClassRanking {
        rank(&self.thresholded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::IdpAxis;
    use crate::table::TableBuilder;
    use crate::types::{ClassDecision, Trapezoid};
    use hydro_common::{Field, HydrometeorClass, ObservableBinding};

    fn registry() -> HydrometeorRegistry {
        HydrometeorRegistry::new(vec![
            HydrometeorClass::new("LR", "Light Rain"),
            HydrometeorClass::new("HL", "Hail"),
        ])
        .unwrap()
    }

    fn table() -> MembershipTable {
        let axis = IdpAxis::new(vec![0.0]).unwrap();
        let obs = vec!["zh".to_string(), "zdr".to_string()];
        let mut b = TableBuilder::new(&registry(), obs, axis).unwrap();
        b.set("LR", "zh", 0.0, Trapezoid::new(0.0, 10.0, 20.0, 30.0)).unwrap();
        b.set("LR", "zdr", 0.0, Trapezoid::new(0.0, 0.5, 1.5, 2.0)).unwrap();
        b.set("HL", "zh", 0.0, Trapezoid::new(40.0, 50.0, 70.0, 80.0)).unwrap();
        b.set("HL", "zdr", 0.0, Trapezoid::new(-1.0, -0.5, 0.5, 1.0)).unwrap();
        b.build().unwrap()
    }

    fn config() -> ClassifierConfig {
        ClassifierConfig::default().with_bindings(vec![
            ObservableBinding::new("DBZH", "zh", 1.0),
            ObservableBinding::new("ZDR", "zdr", 1.0),
        ])
    }

    fn fields() -> FieldSet {
        FieldSet::from_fields(vec![
            Field::flat("DBZH", vec![15.0, 60.0, f32::NAN]),
            Field::flat("ZDR", vec![1.0, 0.0, f32::NAN]),
        ])
        .unwrap()
    }

    fn classifier() -> HydrometeorClassifier {
        let mut cfg = config();
        cfg.independent_field = "DBZH".to_string();
        HydrometeorClassifier::new(registry(), table(), cfg).unwrap()
    }

    #[test]
    fn test_classify_basic() {
        let out = classifier().classify(&fields()).unwrap();
        assert_eq!(out.result.decisions, vec![
            ClassDecision::Class(0),
            ClassDecision::Class(1),
            ClassDecision::Unclassified,
        ]);
        assert_eq!(out.probabilities.get(0, 0), Some(1.0));
        assert_eq!(out.summary.counts, vec![1, 1]);
        assert_eq!(out.summary.unclassified, 1);
    }

    #[test]
    fn test_missing_binding_in_table() {
        let cfg = config().with_bindings(vec![ObservableBinding::new("KDP", "kdp", 1.0)]);
        let err = HydrometeorClassifier::new(registry(), table(), cfg).unwrap_err();
        assert!(matches!(err, HydroError::MissingObservable { .. }));
    }

    #[test]
    fn test_registry_mismatch() {
        let err = HydrometeorClassifier::new(HydrometeorRegistry::standard(), table(), config()).unwrap_err();
        assert!(matches!(err, HydroError::Configuration(_)));
    }

    #[test]
    fn test_missing_field() {
        let c = classifier();
        let only_zh = FieldSet::from_fields(vec![Field::flat("DBZH", vec![1.0])]).unwrap();
        assert!(matches!(c.plan(&only_zh), Err(HydroError::MissingObservable { .. })));
        assert!(matches!(c.plan(&FieldSet::new()), Err(HydroError::MissingObservable { .. })));
    }

    #[test]
    fn test_cancel_between_stages() {
        let c = classifier();
        let f = fields();
        let token = CancelToken::new();
        let plan = c.plan(&f).unwrap().with_cancel(token.clone());
        token.cancel();
        assert!(matches!(plan.execute(), Err(HydroError::Cancelled("select_corners"))));
    }

    #[test]
    fn test_ranking_from_output() {
        let out = classifier().classify(&fields()).unwrap();
        let ranking = out.ranking();
        assert_eq!(ranking.bin_order(1)[0], 1);
    }
}
