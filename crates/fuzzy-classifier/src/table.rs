//! Membership function table.
//!
//! Holds one trapezoid per (class, observable, idp bin). Storage is a flat
//! `Vec<f32>` laid out `[class][observable][idp][corner]` so that one
//! (class, observable) pair owns a contiguous run of idp rows.
//!
//! Tables are validated once at construction; lookups never re-check.

use hydro_common::{HydroError, HydroResult, HydrometeorRegistry};
use tracing::debug;

use crate::indexer::IdpAxis;
use crate::types::{IndexMethod, Trapezoid, CORNERS};

/// Immutable membership function table.
#[derive(Debug, Clone)]
pub struct MembershipTable {
    classes: Vec<String>,
    observables: Vec<String>,
    idp: IdpAxis,
    data: Vec<f32>,
}

impl MembershipTable {
    /// Create a table from raw corner data.
    ///
    /// `data` must hold `registry.len() * observables.len() * idp.len() * 4`
    /// values in `[class][observable][idp][corner]` order. Fails with a
    /// Configuration error when the length is wrong, an observable name is
    /// empty or repeated, or any corner set is non-finite or decreasing.
    pub fn new(
        registry: &HydrometeorRegistry,
        observables: Vec<String>,
        idp: IdpAxis,
        data: Vec<f32>,
    ) -> HydroResult<Self> {
        let classes: Vec<String> = registry.codes().into_iter().map(String::from).collect();

        validate_observables(&observables)?;

        let expected = classes.len() * observables.len() * idp.len() * CORNERS;
        if data.len() != expected {
            return Err(HydroError::configuration(format!(
                "membership table holds {} values, expected {} ({} classes x {} observables x {} idp bins x {} corners)",
                data.len(),
                expected,
                classes.len(),
                observables.len(),
                idp.len(),
                CORNERS
            )));
        }

        let table = Self {
            classes,
            observables,
            idp,
            data,
        };
        table.validate()?;

        debug!(
            classes = table.num_classes(),
            observables = table.num_observables(),
            idp_bins = table.idp.len(),
            "Membership table validated"
        );

        Ok(table)
    }

    /// Check every corner set for finiteness and ordering.
    fn validate(&self) -> HydroResult<()> {
        for class in 0..self.num_classes() {
            for obs in 0..self.num_observables() {
                for idp in 0..self.idp.len() {
                    let t = Trapezoid::from_slice(self.corner_slice(class, obs, idp));
                    if !t.is_valid() {
                        return Err(HydroError::configuration(format!(
                            "invalid corners for class '{}', observable '{}', idp {}: [{}, {}, {}, {}] (must be finite and non-decreasing)",
                            self.classes[class],
                            self.observables[obs],
                            self.idp.values()[idp],
                            t.a,
                            t.b,
                            t.c,
                            t.d
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    #[inline]
    fn offset(&self, class: usize, observable: usize, idp: usize) -> usize {
        ((class * self.observables.len() + observable) * self.idp.len() + idp) * CORNERS
    }

    /// Raw corners of one entry; indices must be in range.
    #[inline]
    pub(crate) fn corner_slice(&self, class: usize, observable: usize, idp: usize) -> &[f32] {
        let start = self.offset(class, observable, idp);
        &self.data[start..start + CORNERS]
    }

    /// Corner set for (class, observable, idp bin).
    pub fn corners(&self, class: usize, observable: usize, idp: usize) -> Option<Trapezoid> {
        if class >= self.num_classes() || observable >= self.num_observables() || idp >= self.idp.len() {
            return None;
        }
        Some(Trapezoid::from_slice(self.corner_slice(class, observable, idp)))
    }

    /// Corner set for (class, observable) at an independent-observable value.
    ///
    /// Out-of-range values clamp to the edge bins; NaN yields NaN corners.
    pub fn corners_at(
        &self,
        class: usize,
        observable: usize,
        value: f32,
        method: IndexMethod,
    ) -> Option<Trapezoid> {
        if class >= self.num_classes() || observable >= self.num_observables() {
            return None;
        }
        let corners = match method {
            IndexMethod::Nearest => match self.idp.nearest(value) {
                Some(idp) => Trapezoid::from_slice(self.corner_slice(class, observable, idp)),
                None => Trapezoid::nan(),
            },
            IndexMethod::Linear => match self.idp.bracket(value) {
                Some(b) => {
                    let lo = self.corner_slice(class, observable, b.lower);
                    let hi = self.corner_slice(class, observable, b.upper);
                    Trapezoid::new(
                        lo[0] + (hi[0] - lo[0]) * b.weight,
                        lo[1] + (hi[1] - lo[1]) * b.weight,
                        lo[2] + (hi[2] - lo[2]) * b.weight,
                        lo[3] + (hi[3] - lo[3]) * b.weight,
                    )
                }
                None => Trapezoid::nan(),
            },
        };
        Some(corners)
    }

    /// Corner set looked up by class code and observable name.
    pub fn lookup(&self, class_code: &str, observable: &str, idp: usize) -> Option<Trapezoid> {
        let class = self
            .classes
            .iter()
            .position(|c| c.eq_ignore_ascii_case(class_code))?;
        let obs = self.observable_index(observable)?;
        self.corners(class, obs, idp)
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn num_observables(&self) -> usize {
        self.observables.len()
    }

    /// Class codes in axis order.
    pub fn class_codes(&self) -> &[String] {
        &self.classes
    }

    /// Observable names in axis order.
    pub fn observables(&self) -> &[String] {
        &self.observables
    }

    /// Axis index of an observable name (case-insensitive).
    pub fn observable_index(&self, name: &str) -> Option<usize> {
        self.observables
            .iter()
            .position(|o| o.eq_ignore_ascii_case(name))
    }

    pub fn idp_axis(&self) -> &IdpAxis {
        &self.idp
    }

    /// Check that this table was built for the given registry.
    pub fn check_registry(&self, registry: &HydrometeorRegistry) -> HydroResult<()> {
        let codes = registry.codes();
        if codes.len() != self.classes.len()
            || codes
                .iter()
                .zip(&self.classes)
                .any(|(a, b)| !a.eq_ignore_ascii_case(b))
        {
            return Err(HydroError::configuration(format!(
                "membership table classes {:?} do not match registry classes {:?}",
                self.classes, codes
            )));
        }
        Ok(())
    }
}

/// Observable names must be non-empty and unique, ignoring ASCII case.
fn validate_observables(observables: &[String]) -> HydroResult<()> {
    if observables.is_empty() {
        return Err(HydroError::configuration(
            "membership table must define at least one observable",
        ));
    }
    for (i, name) in observables.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(HydroError::configuration(format!(
                "membership table observable at index {} has an empty name",
                i
            )));
        }
        if observables[..i]
            .iter()
            .any(|earlier| earlier.eq_ignore_ascii_case(name))
        {
            return Err(HydroError::configuration(format!(
                "duplicate membership table observable '{}'",
                name
            )));
        }
    }
    Ok(())
}

/// Assembles a [`MembershipTable`] one entry at a time.
///
/// Every (class, observable, idp) triple must be set before [`build`]
/// succeeds.
///
/// [`build`]: TableBuilder::build
#[derive(Debug)]
pub struct TableBuilder {
    registry: HydrometeorRegistry,
    observables: Vec<String>,
    idp: IdpAxis,
    entries: Vec<Option<Trapezoid>>,
}

impl TableBuilder {
    pub fn new(
        registry: &HydrometeorRegistry,
        observables: Vec<String>,
        idp: IdpAxis,
    ) -> HydroResult<Self> {
        validate_observables(&observables)?;
        let entries = vec![None; registry.len() * observables.len() * idp.len()];
        Ok(Self {
            registry: registry.clone(),
            observables,
            idp,
            entries,
        })
    }

    /// Set the corners of one entry, addressed by class code, observable
    /// name and idp axis value. Each entry may be set only once.
    pub fn set(
        &mut self,
        class_code: &str,
        observable: &str,
        idp_value: f32,
        corners: Trapezoid,
    ) -> HydroResult<&mut Self> {
        let class = self.registry.index_of(class_code).ok_or_else(|| {
            HydroError::configuration(format!(
                "membership table entry references unknown class '{}'",
                class_code
            ))
        })?;
        let obs = self
            .observables
            .iter()
            .position(|o| o.eq_ignore_ascii_case(observable))
            .ok_or_else(|| {
                HydroError::configuration(format!(
                    "membership table entry references undeclared observable '{}'",
                    observable
                ))
            })?;
        let idp = self.idp.position_of(idp_value).ok_or_else(|| {
            HydroError::configuration(format!(
                "membership table entry uses idp value {} which is not on the axis",
                idp_value
            ))
        })?;
        self.set_indexed(class, obs, idp, corners)?;
        Ok(self)
    }

    /// Set the corners of one entry by axis indices.
    pub(crate) fn set_indexed(
        &mut self,
        class: usize,
        observable: usize,
        idp: usize,
        corners: Trapezoid,
    ) -> HydroResult<()> {
        if class >= self.registry.len() || observable >= self.observables.len() || idp >= self.idp.len()
        {
            return Err(HydroError::configuration(format!(
                "membership entry ({}, {}, {}) is outside the table",
                class, observable, idp
            )));
        }
        let slot = (class * self.observables.len() + observable) * self.idp.len() + idp;
        if self.entries[slot].is_some() {
            let code = self
                .registry
                .get(class)
                .map(|c| c.code.as_str())
                .unwrap_or("?");
            return Err(HydroError::configuration(format!(
                "membership entry for class '{}', observable '{}', idp {} is defined more than once",
                code,
                self.observables[observable],
                self.idp.values()[idp]
            )));
        }
        self.entries[slot] = Some(corners);
        Ok(())
    }

    /// Finish the table; fails naming the first entry never set.
    pub fn build(self) -> HydroResult<MembershipTable> {
        let num_obs = self.observables.len();
        let num_idp = self.idp.len();
        let mut data = Vec::with_capacity(self.entries.len() * CORNERS);

        for (slot, entry) in self.entries.iter().enumerate() {
            match entry {
                Some(t) => data.extend_from_slice(&t.to_array()),
                None => {
                    let class = slot / (num_obs * num_idp);
                    let obs = (slot / num_idp) % num_obs;
                    let idp = slot % num_idp;
                    let code = self
                        .registry
                        .get(class)
                        .map(|c| c.code.as_str())
                        .unwrap_or("?");
                    return Err(HydroError::configuration(format!(
                        "missing membership entry for class '{}', observable '{}', idp {}",
                        code,
                        self.observables[obs],
                        self.idp.values()[idp]
                    )));
                }
            }
        }

        MembershipTable::new(&self.registry, self.observables, self.idp, data)
    }
}
