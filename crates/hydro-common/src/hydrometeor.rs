//! Hydrometeor class catalogue.
//!
//! The position of a class in the registry is its array axis index in every
//! membership table, probability grid and decision. The registry is built
//! once and never mutated.

use serde::{Deserialize, Serialize};

use crate::error::{HydroError, HydroResult};

/// One hydrometeor class: short code plus human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HydrometeorClass {
    /// Short code (e.g. "HL")
    pub code: String,
    /// Human-readable label (e.g. "Hail")
    pub label: String,
}

impl HydrometeorClass {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }
}

impl std::fmt::Display for HydrometeorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code, self.label)
    }
}

/// Standard polarimetric catalogue, in axis order.
const STANDARD_CLASSES: [(&str, &str); 11] = [
    ("LR", "Light Rain"),
    ("MR", "Moderate Rain"),
    ("HR", "Heavy Rain"),
    ("LD", "Large Drops"),
    ("HL", "Hail"),
    ("RH", "Rain/Hail"),
    ("GH", "Graupel/Hail"),
    ("DS", "Dry Snow"),
    ("WS", "Wet Snow"),
    ("HC", "Horizontal Ice Crystals"),
    ("VC", "Vertical Ice Crystals"),
];

/// Ordered, immutable catalogue of hydrometeor classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HydrometeorRegistry {
    classes: Vec<HydrometeorClass>,
}

impl HydrometeorRegistry {
    /// Build a registry from an ordered list of classes.
    ///
    /// Fails on an empty list, an empty code or a duplicate code (codes are
    /// compared case-insensitively).
    pub fn new(classes: Vec<HydrometeorClass>) -> HydroResult<Self> {
        if classes.is_empty() {
            return Err(HydroError::configuration(
                "hydrometeor registry must contain at least one class",
            ));
        }

        for (i, class) in classes.iter().enumerate() {
            if class.code.trim().is_empty() {
                return Err(HydroError::configuration(format!(
                    "hydrometeor class at index {} has an empty code",
                    i
                )));
            }
            let duplicate = classes[..i]
                .iter()
                .any(|earlier| earlier.code.eq_ignore_ascii_case(&class.code));
            if duplicate {
                return Err(HydroError::configuration(format!(
                    "duplicate hydrometeor class code '{}'",
                    class.code
                )));
            }
        }

        Ok(Self { classes })
    }

    /// The 11-class polarimetric catalogue (LR, MR, HR, LD, HL, RH, GH, DS,
    /// WS, HC, VC).
    pub fn standard() -> Self {
        Self {
            classes: STANDARD_CLASSES
                .iter()
                .map(|(code, label)| HydrometeorClass::new(*code, *label))
                .collect(),
        }
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Always false for a constructed registry.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class at an axis index.
    pub fn get(&self, index: usize) -> Option<&HydrometeorClass> {
        self.classes.get(index)
    }

    /// Axis index of a class code (case-insensitive).
    pub fn index_of(&self, code: &str) -> Option<usize> {
        self.classes
            .iter()
            .position(|class| class.code.eq_ignore_ascii_case(code))
    }

    /// Class codes in axis order.
    pub fn codes(&self) -> Vec<&str> {
        self.classes.iter().map(|c| c.code.as_str()).collect()
    }

    /// Iterate `(index, class)` in axis order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &HydrometeorClass)> {
        self.classes.iter().enumerate()
    }
}

impl Default for HydrometeorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'de> Deserialize<'de> for HydrometeorRegistry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            classes: Vec<HydrometeorClass>,
        }

        let raw = Raw::deserialize(deserializer)?;
        HydrometeorRegistry::new(raw.classes).map_err(serde::de::Error::custom)
    }
}
