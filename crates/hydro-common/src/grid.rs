//! Bin-index space and gridded observable fields.
//!
//! A polar volume is addressed as `[elevation, azimuth, range]` (or any other
//! ordered list of dimensions); the classifier only ever sees the flattened,
//! row-major bin axis.

use serde::{Deserialize, Serialize};

use crate::error::{HydroError, HydroResult};

/// Ordered dimension lengths of a bin-index space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BinShape(Vec<usize>);

impl BinShape {
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    /// A one-dimensional space of `n` bins.
    pub fn flat(n: usize) -> Self {
        Self(vec![n])
    }

    /// Polar volume shape.
    pub fn polar(elevations: usize, azimuths: usize, ranges: usize) -> Self {
        Self(vec![elevations, azimuths, ranges])
    }

    /// Dimension lengths.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Total number of bins (product of the dimensions).
    pub fn len(&self) -> usize {
        self.0.iter().product()
    }

    /// Check if the space holds no bins.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat row-major index for a multi-dimensional position.
    pub fn flat_index(&self, position: &[usize]) -> Option<usize> {
        if position.len() != self.0.len() {
            return None;
        }
        let mut index = 0usize;
        for (&p, &n) in position.iter().zip(&self.0) {
            if p >= n {
                return None;
            }
            index = index * n + p;
        }
        Some(index)
    }
}

impl std::fmt::Display for BinShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dims: Vec<String> = self.0.iter().map(|d| d.to_string()).collect();
        write!(f, "{}", dims.join("x"))
    }
}

/// One named observable field over a bin-index space.
///
/// Missing values are NaN in memory and `null` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub shape: BinShape,
    #[serde(with = "nan_as_null")]
    pub data: Vec<f32>,
}

impl Field {
    /// Create a field, checking that the data length matches the shape.
    pub fn new(name: impl Into<String>, shape: BinShape, data: Vec<f32>) -> HydroResult<Self> {
        let name = name.into();
        if data.len() != shape.len() {
            return Err(HydroError::shape_mismatch(
                name,
                shape.dims(),
                &[data.len()],
            ));
        }
        Ok(Self { name, shape, data })
    }

    /// A flat field of `data.len()` bins.
    pub fn flat(name: impl Into<String>, data: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            shape: BinShape::flat(data.len()),
            data,
        }
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the field holds no bins.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of NaN (missing) bins.
    pub fn missing_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }
}

/// A set of fields sharing one bin-index space.
///
/// The first field inserted fixes the shape; every later field must match it.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    shape: Option<BinShape>,
    fields: Vec<Field>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a list of fields.
    pub fn from_fields(fields: Vec<Field>) -> HydroResult<Self> {
        let mut set = Self::new();
        for field in fields {
            set.insert(field)?;
        }
        Ok(set)
    }

    /// Add a field, replacing any field with the same name.
    pub fn insert(&mut self, field: Field) -> HydroResult<()> {
        if field.data.len() != field.shape.len() {
            return Err(HydroError::shape_mismatch(
                field.name,
                field.shape.dims(),
                &[field.data.len()],
            ));
        }

        match &self.shape {
            Some(shape) if *shape != field.shape => {
                return Err(HydroError::shape_mismatch(
                    field.name,
                    shape.dims(),
                    field.shape.dims(),
                ));
            }
            Some(_) => {}
            None => self.shape = Some(field.shape.clone()),
        }

        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == field.name) {
            *existing = field;
        } else {
            self.fields.push(field);
        }
        Ok(())
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field by name, failing with MissingObservable.
    pub fn require(&self, name: &str) -> HydroResult<&Field> {
        self.get(name)
            .ok_or_else(|| HydroError::missing_observable(name, "input fields"))
    }

    /// Shared shape, if any field has been inserted.
    pub fn shape(&self) -> Option<&BinShape> {
        self.shape.as_ref()
    }

    /// Field names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Serde adapter storing NaN as JSON `null`.
pub mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(data: &[f32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let values: Vec<Option<f32>> = data
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect();
        values.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values = Vec::<Option<f32>>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
    }
}
