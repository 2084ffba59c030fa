//! Night / quiet duty caps.
//!
//! The overlay is a pure clamp: it can only lower the fan duty.  When both
//! modes are active the lower cap wins.

use log::debug;

use crate::config::{ClimateConfig, parse_hhmm};

/// Time-of-day window in minutes after midnight.  `end` is exclusive and
/// the window may wrap past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightWindow {
    pub start_min: u16,
    pub end_min: u16,
}

impl NightWindow {
    /// Parse the configured "HH:MM" pair.  `None` if either end is unparsable.
    pub fn from_config(cfg: &ClimateConfig) -> Option<Self> {
        Some(Self {
            start_min: parse_hhmm(&cfg.night.start)?,
            end_min: parse_hhmm(&cfg.night.end)?,
        })
    }

    pub fn contains(&self, minute_of_day: u16) -> bool {
        if self.start_min <= self.end_min {
            // e.g. 13:00..15:00; empty when start == end
            minute_of_day >= self.start_min && minute_of_day < self.end_min
        } else {
            // e.g. 21:00..05:00, wraps around midnight
            minute_of_day >= self.start_min || minute_of_day < self.end_min
        }
    }
}

/// Which overlays apply this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct ActiveModes {
    pub night: bool,
    pub quiet: bool,
}

impl ActiveModes {
    /// Evaluate the mode predicates.  An unknown wall clock means the night
    /// window is treated as inactive.
    pub fn evaluate(cfg: &ClimateConfig, minute_of_day: Option<u16>) -> Self {
        let night = cfg.night.enabled
            && minute_of_day
                .zip(NightWindow::from_config(cfg))
                .is_some_and(|(m, w)| w.contains(m));
        Self {
            night,
            quiet: cfg.quiet.enabled,
        }
    }
}

/// Clamp `duty` under the active caps.
pub fn overlay(
    duty: u8,
    night_active: bool,
    quiet_active: bool,
    night_fan_max: u8,
    quiet_fan_max: u8,
) -> u8 {
    let mut capped = duty;
    if night_active {
        capped = capped.min(night_fan_max);
    }
    if quiet_active {
        capped = capped.min(quiet_fan_max);
    }
    if capped != duty {
        debug!("overlay: fan duty {duty} capped to {capped}");
    }
    capped
}

/// [`overlay`] with caps taken from the configuration.
pub fn apply(duty: u8, modes: ActiveModes, cfg: &ClimateConfig) -> u8 {
    overlay(
        duty,
        modes.night,
        modes.quiet,
        cfg.night.fan_max.clamp(0.0, 255.0) as u8,
        cfg.quiet.fan_max.clamp(0.0, 255.0) as u8,
    )
}
