//! Membership table and registry fixtures.
//!
//! Tables are produced in the line-oriented text format
//! (`class observable idp a b c d`) so this crate stays independent of the
//! classifier crate.

use hydro_common::{HydrometeorClass, HydrometeorRegistry};

/// Idp axis of the standard fixture table: -10 to 70 dBZ in 5 dBZ steps.
pub mod idp {
    pub const START: f32 = -10.0;
    pub const STEP: f32 = 5.0;
    pub const COUNT: usize = 17;

    /// All axis values.
    pub fn values() -> Vec<f32> {
        (0..COUNT).map(|i| START + STEP * i as f32).collect()
    }
}

/// Observable order of the standard fixture table.
pub const STANDARD_OBSERVABLES: [&str; 5] = ["zh", "zdr", "rho", "kdp", "tmp"];

/// C-band style corners per class, in [`STANDARD_OBSERVABLES`] order.
///
/// Rain classes shift their ZDR corners with the idp value (see
/// [`standard_corners`]).
pub const STANDARD_CORNERS: [(&str, [[f32; 4]; 5]); 11] = [
    ("LR", [
        [5.0, 10.0, 35.0, 40.0],
        [-0.3, 0.0, 0.6, 1.0],
        [0.95, 0.97, 1.0, 1.01],
        [-1.0, -0.5, 0.5, 1.0],
        [0.0, 5.0, 40.0, 45.0],
    ]),
    ("MR", [
        [30.0, 35.0, 45.0, 50.0],
        [0.4, 0.8, 1.5, 2.0],
        [0.95, 0.97, 1.0, 1.01],
        [-1.0, 0.0, 1.0, 2.0],
        [0.0, 5.0, 40.0, 45.0],
    ]),
    ("HR", [
        [40.0, 45.0, 55.0, 60.0],
        [0.8, 1.2, 2.5, 3.0],
        [0.92, 0.95, 1.0, 1.01],
        [0.5, 1.5, 8.0, 10.0],
        [0.0, 5.0, 40.0, 45.0],
    ]),
    ("LD", [
        [20.0, 25.0, 50.0, 55.0],
        [2.0, 2.5, 4.0, 5.0],
        [0.92, 0.95, 1.0, 1.01],
        [-1.0, 0.0, 1.0, 2.0],
        [0.0, 5.0, 40.0, 45.0],
    ]),
    ("HL", [
        [40.0, 50.0, 75.0, 80.0],
        [-0.3, 0.0, 0.5, 1.0],
        [0.75, 0.8, 0.95, 0.98],
        [-1.0, 0.0, 2.0, 4.0],
        [-30.0, -25.0, 20.0, 30.0],
    ]),
    ("RH", [
        [45.0, 50.0, 75.0, 80.0],
        [-0.3, 0.0, 0.6, 1.5],
        [0.75, 0.8, 0.95, 0.98],
        [1.0, 2.0, 8.0, 10.0],
        [-5.0, 0.0, 40.0, 45.0],
    ]),
    ("GH", [
        [25.0, 35.0, 50.0, 55.0],
        [-0.3, 0.0, 0.8, 1.2],
        [0.9, 0.95, 1.0, 1.01],
        [-1.0, -0.5, 0.5, 1.0],
        [-30.0, -25.0, 0.0, 5.0],
    ]),
    ("DS", [
        [5.0, 10.0, 35.0, 40.0],
        [-0.3, 0.0, 0.3, 0.6],
        [0.95, 0.98, 1.0, 1.01],
        [-1.0, -0.5, 0.5, 1.0],
        [-40.0, -35.0, -5.0, 0.0],
    ]),
    ("WS", [
        [25.0, 30.0, 40.0, 50.0],
        [0.5, 1.0, 2.0, 3.0],
        [0.8, 0.85, 0.95, 0.98],
        [-1.0, -0.5, 0.5, 1.0],
        [-5.0, -3.0, 3.0, 5.0],
    ]),
    ("HC", [
        [-10.0, 0.0, 20.0, 25.0],
        [0.1, 0.4, 3.0, 3.3],
        [0.95, 0.98, 1.0, 1.01],
        [0.0, 0.1, 0.4, 0.6],
        [-50.0, -45.0, -15.0, -10.0],
    ]),
    ("VC", [
        [-10.0, 0.0, 20.0, 25.0],
        [-0.9, -0.5, 0.0, 0.2],
        [0.95, 0.98, 1.0, 1.01],
        [-0.6, -0.4, 0.0, 0.1],
        [-50.0, -45.0, -15.0, -10.0],
    ]),
];

/// ZDR shift per dBZ of idp for the rain classes.
const RAIN_ZDR_SLOPE: f32 = 0.01;

/// Corners of one standard entry.
///
/// Returns `None` for an unknown class code or observable index.
pub fn standard_corners(class_code: &str, observable: usize, idp_value: f32) -> Option<[f32; 4]> {
    let (_, rows) = STANDARD_CORNERS
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(class_code))?;
    let mut corners = *rows.get(observable)?;

    let is_rain = matches!(class_code, "LR" | "MR" | "HR");
    if is_rain && STANDARD_OBSERVABLES[observable] == "zdr" {
        let shift = RAIN_ZDR_SLOPE * idp_value.max(0.0);
        for c in &mut corners {
            *c += shift;
        }
    }
    Some(corners)
}

/// The full 11-class, 5-observable, 17-bin fixture table in text format.
pub fn standard_table_text() -> String {
    let mut out = String::from("# class observable idp a b c d\n");
    for (code, _) in STANDARD_CORNERS.iter() {
        for (obs, name) in STANDARD_OBSERVABLES.iter().enumerate() {
            for value in idp::values() {
                if let Some([a, b, c, d]) = standard_corners(code, obs, value) {
                    out.push_str(&format!(
                        "{} {} {} {} {} {} {}\n",
                        code, name, value, a, b, c, d
                    ));
                }
            }
        }
    }
    out
}

/// One-class registry used by the small pipeline scenarios.
pub fn scenario_registry() -> HydrometeorRegistry {
    HydrometeorRegistry::new(vec![HydrometeorClass::new("RA", "Rain")])
        .expect("scenario registry is valid")
}

/// Two-class registry (rain, hail) for decision tests.
pub fn rain_hail_registry() -> HydrometeorRegistry {
    HydrometeorRegistry::new(vec![
        HydrometeorClass::new("RA", "Rain"),
        HydrometeorClass::new("HA", "Hail"),
    ])
    .expect("rain/hail registry is valid")
}

/// Single class, single observable `zh`, single idp bin, corners (0, 10, 20, 30).
pub const SCENARIO_ONE_OBSERVABLE: &str = "\
# class observable idp a b c d
RA zh 0 0 10 20 30
";

/// Single class, observables `p1` and `p2` over one idp bin.
///
/// `p1` is on its plateau for values in [10, 20]; `p2` has its plateau in
/// [100, 200], so a value of 15 gives degrees (1, 0).
pub const SCENARIO_TWO_OBSERVABLES: &str = "\
# class observable idp a b c d
RA p1 0 0 10 20 30
RA p2 0 90 100 200 210
";

/// Rain/hail table keyed on `zh` with a second observable `zdr`, two idp bins.
pub const RAIN_HAIL_TABLE: &str = "\
# class observable idp a b c d
RA zh   20  5 10 40 50
RA zh   50  5 10 40 50
RA zdr  20 -0.5 0.0 1.0 1.5
RA zdr  50  0.5 1.0 3.0 3.5
HA zh   20 40 50 70 80
HA zh   50 40 50 70 80
HA zdr  20 -1.0 -0.5 0.5 1.0
HA zdr  50 -1.0 -0.5 0.5 1.0
";
