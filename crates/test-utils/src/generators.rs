//! Generators for synthetic polarimetric radar fields.
//!
//! Fields are laid out row-major over (azimuth, range), one elevation. A
//! single convective cell sits at mid-azimuth and mid-range on top of light
//! stratiform echo; the derived observables follow the reflectivity so the
//! classifier sees physically consistent bins.

use hydro_common::{BinShape, Field, FieldSet};

/// Background reflectivity outside the cell (dBZ).
pub const STRATIFORM_DBZ: f32 = 18.0;

/// Peak reflectivity at the cell core (dBZ).
pub const CELL_PEAK_DBZ: f32 = 62.0;

/// Creates a reflectivity field with one convective cell.
///
/// # Arguments
///
/// * `azimuths` - Number of rays
/// * `ranges` - Number of gates per ray
///
/// # Returns
///
/// A `Vec<f32>` of `azimuths * ranges` values in dBZ.
pub fn create_reflectivity_field(azimuths: usize, ranges: usize) -> Vec<f32> {
    let center_az = azimuths as f32 / 2.0;
    let center_rg = ranges as f32 / 2.0;
    let radius = (azimuths.min(ranges) as f32 / 6.0).max(1.0);

    let mut data = Vec::with_capacity(azimuths * ranges);
    for az in 0..azimuths {
        for rg in 0..ranges {
            let da = az as f32 - center_az;
            let dr = rg as f32 - center_rg;
            let dist2 = (da * da + dr * dr) / (radius * radius);
            let cell = (CELL_PEAK_DBZ - STRATIFORM_DBZ) * (-dist2).exp();
            data.push(STRATIFORM_DBZ + cell);
        }
    }
    data
}

/// Differential reflectivity following reflectivity (dB).
///
/// Grows with reflectivity up to the big-drop regime, then falls back toward
/// zero in the hail core (tumbling stones).
pub fn create_zdr_field(reflectivity: &[f32]) -> Vec<f32> {
    reflectivity
        .iter()
        .map(|&z| {
            if z.is_nan() {
                f32::NAN
            } else if z > 55.0 {
                0.2
            } else {
                (0.06 * (z - 15.0)).clamp(0.0, 2.5)
            }
        })
        .collect()
}

/// Correlation coefficient following reflectivity.
///
/// Near 0.99 in rain, dipping in the mixed-phase core.
pub fn create_rho_field(reflectivity: &[f32]) -> Vec<f32> {
    reflectivity
        .iter()
        .map(|&z| {
            if z.is_nan() {
                f32::NAN
            } else if z > 55.0 {
                0.9
            } else {
                0.99
            }
        })
        .collect()
}

/// Specific differential phase following reflectivity (deg/km).
pub fn create_kdp_field(reflectivity: &[f32]) -> Vec<f32> {
    reflectivity
        .iter()
        .map(|&z| {
            if z.is_nan() {
                f32::NAN
            } else {
                // Z-Kdp power law, linear units
                let linear = 10f32.powf(z / 10.0);
                (linear / 1.0e5).powf(0.8).min(12.0)
            }
        })
        .collect()
}

/// Temperature falling linearly with range (beam height) in degC.
///
/// # Arguments
///
/// * `azimuths` - Number of rays
/// * `ranges` - Number of gates per ray
/// * `near_c` - Temperature at the first gate
/// * `far_c` - Temperature at the last gate
pub fn create_temperature_field(azimuths: usize, ranges: usize, near_c: f32, far_c: f32) -> Vec<f32> {
    let span = (ranges.max(2) - 1) as f32;
    let mut data = Vec::with_capacity(azimuths * ranges);
    for _az in 0..azimuths {
        for rg in 0..ranges {
            data.push(near_c + (far_c - near_c) * rg as f32 / span);
        }
    }
    data
}

/// Creates a reflectivity field with deterministic speckle.
///
/// Roughly one gate in four carries echo between 0 and 60 dBZ; the rest are
/// NaN (no echo).
pub fn create_speckle_reflectivity(azimuths: usize, ranges: usize, seed: u32) -> Vec<f32> {
    let mut data = Vec::with_capacity(azimuths * ranges);
    for az in 0..azimuths {
        for rg in 0..ranges {
            let hash = simple_hash(rg as u32, az as u32, seed);
            let value = if hash % 4 == 0 {
                (hash % 6000) as f32 / 100.0
            } else {
                f32::NAN
            };
            data.push(value);
        }
    }
    data
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

/// Copy of `data` with NaN at every `stride`-th position, starting at `offset`.
pub fn with_gaps(data: &[f32], stride: usize, offset: usize) -> Vec<f32> {
    let stride = stride.max(1);
    data.iter()
        .enumerate()
        .map(|(i, &v)| {
            if i >= offset && (i - offset) % stride == 0 {
                f32::NAN
            } else {
                v
            }
        })
        .collect()
}

/// Full field set (`zh`, `zdr`, `rho`, `kdp`, `tmp`) over one elevation.
///
/// Temperature runs from 20 degC at the radar to -30 degC at the last gate.
pub fn create_radar_field_set(azimuths: usize, ranges: usize) -> FieldSet {
    let zh = create_reflectivity_field(azimuths, ranges);
    radar_field_set_from(azimuths, ranges, zh)
}

/// Field set whose derived observables follow the given reflectivity.
pub fn radar_field_set_from(azimuths: usize, ranges: usize, zh: Vec<f32>) -> FieldSet {
    let shape = BinShape::polar(1, azimuths, ranges);
    let zdr = create_zdr_field(&zh);
    let rho = create_rho_field(&zh);
    let kdp = create_kdp_field(&zh);
    let tmp = create_temperature_field(azimuths, ranges, 20.0, -30.0);

    let fields = vec![
        Field::new("zh", shape.clone(), zh),
        Field::new("zdr", shape.clone(), zdr),
        Field::new("rho", shape.clone(), rho),
        Field::new("kdp", shape.clone(), kdp),
        Field::new("tmp", shape, tmp),
    ]
    .into_iter()
    .collect::<Result<Vec<_>, _>>()
    .expect("generated fields match their shape");

    FieldSet::from_fields(fields).expect("generated fields share a shape")
}

/// Flat one-field set, handy for single-observable scenarios.
pub fn single_field_set(name: &str, values: Vec<f32>) -> FieldSet {
    FieldSet::from_fields(vec![Field::flat(name, values)]).expect("single field is consistent")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflectivity_cell_peaks_in_center() {
        let zh = create_reflectivity_field(36, 60);
        assert_eq!(zh.len(), 36 * 60);
        let center = 18 * 60 + 30;
        assert!((zh[center] - CELL_PEAK_DBZ).abs() < 0.01);
        assert!((zh[0] - STRATIFORM_DBZ).abs() < 1.0);
    }

    #[test]
    fn test_derived_fields_track_reflectivity() {
        let zh = vec![10.0, 40.0, 60.0, f32::NAN];
        let zdr = create_zdr_field(&zh);
        assert_eq!(zdr[0], 0.0);
        assert!(zdr[1] > 1.0);
        assert_eq!(zdr[2], 0.2);
        assert!(zdr[3].is_nan());

        let rho = create_rho_field(&zh);
        assert_eq!(rho[1], 0.99);
        assert_eq!(rho[2], 0.9);

        let kdp = create_kdp_field(&zh);
        assert!(kdp[0] < kdp[1] && kdp[1] < kdp[2]);
        assert!(kdp[2] <= 12.0);
    }

    #[test]
    fn test_temperature_field_endpoints() {
        let t = create_temperature_field(2, 11, 20.0, -30.0);
        assert_eq!(t[0], 20.0);
        assert_eq!(t[10], -30.0);
        assert_eq!(t[11], 20.0);
    }

    #[test]
    fn test_speckle_deterministic() {
        let a = create_speckle_reflectivity(20, 20, 42);
        let b = create_speckle_reflectivity(20, 20, 42);
        let c = create_speckle_reflectivity(20, 20, 43);
        let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
        assert_ne!(bits(&a), bits(&c));
        assert!(a.iter().any(|v| v.is_nan()));
    }

    #[test]
    fn test_with_gaps() {
        let g = with_gaps(&[1.0; 6], 3, 1);
        assert!(!g[0].is_nan());
        assert!(g[1].is_nan());
        assert!(g[4].is_nan());
        assert!(!g[5].is_nan());
    }

    #[test]
    fn test_radar_field_set_shape() {
        let set = create_radar_field_set(8, 12);
        assert_eq!(set.len(), 5);
        assert_eq!(set.shape().unwrap().dims(), &[1, 8, 12]);
        assert!(set.get("tmp").is_some());
    }
}
