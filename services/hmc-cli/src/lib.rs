//! Hydrometeor classification command-line library.
//!
//! Exposes the run configuration, input loading and report types used by
//! the `hmc` binary.

pub mod commands;
pub mod fields;
pub mod report;
pub mod run_config;

pub use commands::{classify, export_table, inspect_table, write_report, ClassifyOptions};
pub use fields::{load_fields, FieldsDocument};
pub use report::{ClassCount, ClassificationReport, TableReport};
pub use run_config::{load_run_config, parse_run_config, RunConfig};
