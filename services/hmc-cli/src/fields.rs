//! Input field files.
//!
//! JSON or YAML, chosen by extension:
//!
//! ```json
//! { "fields": [
//!     { "name": "DBZH", "shape": [1, 360, 250], "data": [12.5, null, ...] },
//!     { "name": "ZDR",  "shape": [1, 360, 250], "data": [0.3, null, ...] }
//! ] }
//! ```
//!
//! `null` marks a missing bin.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use hydro_common::{Field, FieldSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldsDocument {
    pub fields: Vec<Field>,
}

impl FieldsDocument {
    /// Check shapes and build the field set.
    pub fn into_field_set(self) -> Result<FieldSet> {
        FieldSet::from_fields(self.fields).context("Inconsistent input fields")
    }
}

/// Read a fields file.
pub fn load_fields<P: AsRef<Path>>(path: P) -> Result<FieldSet> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read fields from {:?}", path))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let doc: FieldsDocument = if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))?
    } else {
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))?
    };

    let set = doc.into_field_set()?;
    debug!(
        path = %path.display(),
        fields = ?set.names(),
        shape = ?set.shape().map(|s| s.to_string()),
        "Loaded input fields"
    );
    Ok(set)
}
