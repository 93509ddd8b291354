//! Membership table sources.
//!
//! Tables come from JSON or YAML documents ([`TableDocument`]) or from a
//! whitespace-delimited text format with one entry per line:
//!
//! ```text
//! # class observable idp    a     b     c     d
//! LR      zdr        20.0  -0.3   0.0   0.5   1.0
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use hydro_common::{HydroError, HydroResult, HydrometeorRegistry};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indexer::IdpAxis;
use crate::table::{MembershipTable, TableBuilder};
use crate::types::Trapezoid;

/// Anything that can produce a validated membership table.
pub trait MembershipTableSource {
    /// Load and validate a table for the given registry.
    fn load(&self, registry: &HydrometeorRegistry) -> HydroResult<MembershipTable>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// Serializable table layout.
///
/// `classes[code][observable]` holds one `[a, b, c, d]` row per idp value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDocument {
    /// Independent-observable axis.
    pub idp: Vec<f32>,
    /// Observable names, in table axis order.
    pub observables: Vec<String>,
    /// Corner rows per class code and observable.
    pub classes: BTreeMap<String, BTreeMap<String, Vec<[f32; 4]>>>,
}

impl TableDocument {
    /// Export a table.
    pub fn from_table(table: &MembershipTable) -> Self {
        let mut classes = BTreeMap::new();
        for (class, code) in table.class_codes().iter().enumerate() {
            let mut per_obs = BTreeMap::new();
            for (obs, name) in table.observables().iter().enumerate() {
                let rows: Vec<[f32; 4]> = (0..table.idp_axis().len())
                    .filter_map(|idp| table.corners(class, obs, idp))
                    .map(Trapezoid::to_array)
                    .collect();
                per_obs.insert(name.clone(), rows);
            }
            classes.insert(code.clone(), per_obs);
        }
        Self {
            idp: table.idp_axis().values().to_vec(),
            observables: table.observables().to_vec(),
            classes,
        }
    }

    /// Build a table; classes are placed in registry order.
    pub fn to_table(&self, registry: &HydrometeorRegistry) -> HydroResult<MembershipTable> {
        let axis = IdpAxis::new(self.idp.clone())?;
        let mut builder = TableBuilder::new(registry, self.observables.clone(), axis)?;

        for (code, per_obs) in &self.classes {
            let class = registry.index_of(code).ok_or_else(|| {
                HydroError::configuration(format!(
                    "membership table defines class '{}' which is not in the registry",
                    code
                ))
            })?;
            for (name, rows) in per_obs {
                let obs = self
                    .observables
                    .iter()
                    .position(|o| o.eq_ignore_ascii_case(name))
                    .ok_or_else(|| {
                        HydroError::configuration(format!(
                            "class '{}' defines undeclared observable '{}'",
                            code, name
                        ))
                    })?;
                if rows.len() != self.idp.len() {
                    return Err(HydroError::configuration(format!(
                        "class '{}' observable '{}' has {} rows for {} idp bins",
                        code,
                        name,
                        rows.len(),
                        self.idp.len()
                    )));
                }
                for (idp, row) in rows.iter().enumerate() {
                    builder.set_indexed(class, obs, idp, Trapezoid::from(*row))?;
                }
            }
        }

        builder.build()
    }
}

impl MembershipTableSource for TableDocument {
    fn load(&self, registry: &HydrometeorRegistry) -> HydroResult<MembershipTable> {
        self.to_table(registry)
    }

    fn describe(&self) -> String {
        format!(
            "in-memory table ({} classes, {} observables, {} idp bins)",
            self.classes.len(),
            self.observables.len(),
            self.idp.len()
        )
    }
}

/// On-disk table formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    Json,
    Yaml,
    Text,
}

impl TableFormat {
    /// Guess the format from a file extension; unknown extensions are text.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Text,
        }
    }
}

/// A membership table file.
#[derive(Debug, Clone)]
pub struct TableFile {
    pub path: PathBuf,
    pub format: TableFormat,
}

impl TableFile {
    /// Table file with the format taken from the extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = TableFormat::from_path(&path);
        Self { path, format }
    }

    pub fn with_format(path: impl Into<PathBuf>, format: TableFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }
}

impl MembershipTableSource for TableFile {
    fn load(&self, registry: &HydrometeorRegistry) -> HydroResult<MembershipTable> {
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            HydroError::Io(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        let table = match self.format {
            TableFormat::Json => serde_json::from_str::<TableDocument>(&contents)?.to_table(registry)?,
            TableFormat::Yaml => serde_yaml::from_str::<TableDocument>(&contents)?.to_table(registry)?,
            TableFormat::Text => parse_text_table(&contents, registry)?,
        };

        info!(
            path = %self.path.display(),
            format = ?self.format,
            classes = table.num_classes(),
            observables = table.num_observables(),
            idp_bins = table.idp_axis().len(),
            "Loaded membership table"
        );

        Ok(table)
    }

    fn describe(&self) -> String {
        format!("{} ({:?})", self.path.display(), self.format)
    }
}

/// Parse the line-oriented text format.
///
/// Blank lines and `#` comments are skipped. The idp axis is the sorted set
/// of idp values seen; observables keep their first-seen order.
pub fn parse_text_table(contents: &str, registry: &HydrometeorRegistry) -> HydroResult<MembershipTable> {
    struct Row {
        class: String,
        observable: String,
        idp: f32,
        corners: Trapezoid,
    }

    let mut rows = Vec::new();
    let mut observables: Vec<String> = Vec::new();

    for (lineno, line) in contents.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 7 {
            return Err(HydroError::parse(format!(
                "line {}: expected 7 columns (class observable idp a b c d), found {}",
                lineno + 1,
                parts.len()
            )));
        }

        let mut numbers = [0.0f32; 5];
        for (k, raw) in parts[2..].iter().enumerate() {
            numbers[k] = raw.parse().map_err(|_| {
                HydroError::parse(format!("line {}: invalid number '{}'", lineno + 1, raw))
            })?;
        }

        let observable = parts[1].to_string();
        if !observables.iter().any(|o| o.eq_ignore_ascii_case(&observable)) {
            observables.push(observable.clone());
        }

        rows.push(Row {
            class: parts[0].to_string(),
            observable,
            idp: numbers[0],
            corners: Trapezoid::new(numbers[1], numbers[2], numbers[3], numbers[4]),
        });
    }

    if rows.is_empty() {
        return Err(HydroError::configuration("membership table file has no entries"));
    }

    let mut idp: Vec<f32> = rows.iter().map(|r| r.idp).collect();
    idp.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    idp.dedup();

    let axis = IdpAxis::new(idp)?;
    let mut builder = TableBuilder::new(registry, observables, axis)?;
    for row in &rows {
        builder.set(&row.class, &row.observable, row.idp, row.corners)?;
    }
    builder.build()
}

/// Serialize a table in the text format.
pub fn write_text_table(table: &MembershipTable) -> String {
    let mut out = String::from("# class observable idp a b c d\n");
    for (class, code) in table.class_codes().iter().enumerate() {
        for (obs, name) in table.observables().iter().enumerate() {
            for (idp, value) in table.idp_axis().values().iter().enumerate() {
                if let Some(t) = table.corners(class, obs, idp) {
                    out.push_str(&format!(
                        "{} {} {} {} {} {} {}\n",
                        code, name, value, t.a, t.b, t.c, t.d
                    ));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydro_common::HydrometeorClass;

    fn registry() -> HydrometeorRegistry {
        HydrometeorRegistry::new(vec![
            HydrometeorClass::new("LR", "Light Rain"),
            HydrometeorClass::new("HL", "Hail"),
        ])
        .unwrap()
    }

    const TEXT: &str = "\
# class obs idp a b c d
LR zh  0  -5  0 25 30
LR zh 40  -5  0 25 30
HL zh  0  45 50 70 80   # hail
HL zh 40  45 50 70 80

LR zdr 0  -0.3 0.0 0.5 1.0
LR zdr 40 -0.3 0.2 0.9 1.4
HL zdr 0  -1.0 -0.5 0.5 1.0
HL zdr 40 -1.0 -0.5 0.5 1.0
";

    #[test]
    fn test_parse_text_table() {
        let table = parse_text_table(TEXT, &registry()).unwrap();
        assert_eq!(table.num_classes(), 2);
        assert_eq!(table.observables(), &["zh".to_string(), "zdr".to_string()]);
        assert_eq!(table.idp_axis().values(), &[0.0, 40.0]);
        assert_eq!(table.lookup("LR", "zdr", 1), Some(Trapezoid::new(-0.3, 0.2, 0.9, 1.4)));
    }

    #[test]
    fn test_parse_text_errors() {
        assert!(matches!(
            parse_text_table("LR zh 0 1 2 3", &registry()),
            Err(HydroError::Parse(_))
        ));
        assert!(matches!(
            parse_text_table("LR zh 0 1 2 x 4", &registry()),
            Err(HydroError::Parse(_))
        ));
        assert!(parse_text_table("# nothing\n", &registry()).is_err());
        // HL entries missing
        assert!(matches!(
            parse_text_table("LR zh 0 1 2 3 4", &registry()),
            Err(HydroError::Configuration(_))
        ));
    }

    #[test]
    fn test_conflicting_rows_rejected() {
        let text = format!("{}LR zh 40 50 60 70 80\n", TEXT);
        let err = parse_text_table(&text, &registry()).unwrap_err();
        assert!(matches!(err, HydroError::Configuration(_)));
        assert!(err.to_string().contains("more than once"), "{}", err);

        // Identical repeats are still a malformed table.
        let text = format!("{}HL zdr 0 -1.0 -0.5 0.5 1.0\n", TEXT);
        assert!(parse_text_table(&text, &registry()).is_err());
    }

    #[test]
    fn test_document_rejects_case_variant_class_keys() {
        let table = parse_text_table(TEXT, &registry()).unwrap();
        let mut doc = TableDocument::from_table(&table);
        let rows = doc.classes["LR"].clone();
        doc.classes.insert("lr".to_string(), rows);
        assert!(matches!(
            doc.to_table(&registry()),
            Err(HydroError::Configuration(_))
        ));
    }

    #[test]
    fn test_document_roundtrip() {
        let table = parse_text_table(TEXT, &registry()).unwrap();
        let doc = TableDocument::from_table(&table);
        let json = serde_json::to_string(&doc).unwrap();
        let back: TableDocument = serde_json::from_str(&json).unwrap();
        let rebuilt = back.load(&registry()).unwrap();
        assert_eq!(rebuilt.lookup("HL", "zh", 0), table.lookup("HL", "zh", 0));
        assert_eq!(rebuilt.lookup("LR", "zdr", 1), table.lookup("LR", "zdr", 1));
    }

    #[test]
    fn test_document_rejects_unknown_class_and_row_count() {
        let table = parse_text_table(TEXT, &registry()).unwrap();
        let mut doc = TableDocument::from_table(&table);
        let rows = doc.classes["LR"].clone();
        doc.classes.insert("GH".to_string(), rows);
        assert!(doc.to_table(&registry()).is_err());

        let mut doc = TableDocument::from_table(&table);
        doc.classes.get_mut("HL").unwrap().get_mut("zh").unwrap().pop();
        assert!(doc.to_table(&registry()).is_err());
    }

    #[test]
    fn test_text_writer_roundtrip() {
        let table = parse_text_table(TEXT, &registry()).unwrap();
        let text = write_text_table(&table);
        let back = parse_text_table(&text, &registry()).unwrap();
        assert_eq!(back.lookup("HL", "zdr", 1), table.lookup("HL", "zdr", 1));
    }

    #[test]
    fn test_table_file_formats() {
        let dir = tempfile::tempdir().unwrap();
        let table = parse_text_table(TEXT, &registry()).unwrap();
        let doc = TableDocument::from_table(&table);

        let json_path = dir.path().join("msf.json");
        fs::write(&json_path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
        let yaml_path = dir.path().join("msf.yml");
        fs::write(&yaml_path, serde_yaml::to_string(&doc).unwrap()).unwrap();
        let text_path = dir.path().join("msf.txt");
        fs::write(&text_path, TEXT).unwrap();

        for path in [&json_path, &yaml_path, &text_path] {
            let loaded = TableFile::new(path).load(&registry()).unwrap();
            assert_eq!(loaded.lookup("LR", "zh", 0), Some(Trapezoid::new(-5.0, 0.0, 25.0, 30.0)));
        }

        assert_eq!(TableFile::new(&json_path).format, TableFormat::Json);
        assert_eq!(TableFile::new(&yaml_path).format, TableFormat::Yaml);
        assert_eq!(TableFile::new(&text_path).format, TableFormat::Text);

        let missing = TableFile::new(dir.path().join("absent.json")).load(&registry());
        assert!(matches!(missing, Err(HydroError::Io(_))));
    }
}
