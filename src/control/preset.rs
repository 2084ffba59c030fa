//! Age-band setpoint presets.
//!
//! Brooding chicks need warm, bright housing; requirements fall week by
//! week as the flock feathers out.  [`resolve`] maps flock age to the
//! recommended targets.  Callers decide when to write the result into
//! the configuration (see [`ClimateConfig::with_preset`]).
//!
//! [`ClimateConfig::with_preset`]: crate::config::ClimateConfig::with_preset

/// Recommended targets for one age band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    /// Temperature setpoint (°C).
    pub temp: f32,
    /// Light setpoint (lux).
    pub lux: f32,
    /// Hysteresis half-width (°C).
    pub hys: f32,
    /// Short label of the growth phase.
    pub phase: &'static str,
}

/// Upper age bound (inclusive, days) and preset of each band.
const BANDS: [(u32, Preset); 4] = [
    (3, Preset { temp: 34.0, lux: 22.0, hys: 1.5, phase: "brooding 0-3 days" }),
    (7, Preset { temp: 32.0, lux: 22.0, hys: 1.3, phase: "brooding 4-7 days" }),
    (14, Preset { temp: 30.0, lux: 18.0, hys: 1.0, phase: "week 2" }),
    (21, Preset { temp: 28.0, lux: 15.0, hys: 0.8, phase: "week 3" }),
];

const GROWER: Preset = Preset { temp: 24.0, lux: 12.0, hys: 0.7, phase: "week 4+" };

/// Recommended targets for a flock of `age_days`.
pub fn resolve(age_days: u32) -> Preset {
    BANDS
        .iter()
        .find(|(upper, _)| age_days <= *upper)
        .map_or(GROWER, |(_, p)| *p)
}
