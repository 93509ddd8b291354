//! Fuzzy-logic Hydrometeor Classification Engine
//!
//! Classifies radar bins into hydrometeor types (rain, hail, graupel, snow,
//! ice crystals) from polarimetric observables and a temperature covariate.
//!
//! # Architecture
//!
//! ```text
//! MembershipTable (class × observable × idp × 4 corners)
//!      │
//!      ▼
//! select_corners(independent field)   per-bin trapezoids
//!      │
//!      ▼
//! fuzzify(observations)               membership degree per class/observable
//!      │
//!      ▼
//! aggregate(weights)                  NaN-skipping weighted mean per class
//!      │
//!      ▼
//! threshold + decide                  winning class or Unclassified
//! ```
//!
//! Each stage is a pure function over typed, shape-checked arrays. The
//! [`HydrometeorClassifier`] wires them together after checking the table,
//! registry and bindings against each other.
//!
//! # Example
//!
//! ```ignore
//! use fuzzy_classifier::{ClassifierConfig, HydrometeorClassifier, TableFile, MembershipTableSource};
//! use hydro_common::HydrometeorRegistry;
//!
//! let registry = HydrometeorRegistry::standard();
//! let table = TableFile::new("msf_cband.json").load(&registry)?;
//! let classifier = HydrometeorClassifier::new(registry, table, ClassifierConfig::default())?;
//!
//! let output = classifier.classify(&fields)?;
//! for decision in &output.result.decisions {
//!     // ...
//! }
//! ```

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod fuzzify;
pub mod indexer;
pub mod loader;
pub mod pipeline;
pub mod table;
pub mod types;

// Re-export commonly used types at crate root
pub use aggregate::{aggregate, validate_weights};
pub use classify::{decide, decide_bin, rank, threshold, ThresholdFill};
pub use config::ClassifierConfig;
pub use fuzzify::{fuzzify, trapezoid};
pub use indexer::{select_corners, select_corners_for, IdpAxis};
pub use loader::{parse_text_table, write_text_table, MembershipTableSource, TableDocument, TableFile, TableFormat};
pub use pipeline::{CancelToken, ClassificationOutput, ClassificationPlan, HydrometeorClassifier};
pub use table::{MembershipTable, TableBuilder};
pub use types::{
    ClassDecision, ClassRanking, ClassificationResult, ClassificationSummary, CornerCube, DegreeCube,
    IndexMethod, ProbabilityGrid, Trapezoid,
};
