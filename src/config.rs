//! Climate station configuration.
//!
//! All tunable parameters for the fan/LED control loop and the alert
//! engine.  The schema mirrors the operator's settings document
//! (camelCase JSON) so an exported document can be imported unchanged.
//!
//! A configuration is an immutable snapshot: the control loop reads one
//! snapshot per tick and edits produce a whole new snapshot
//! ([`ClimateConfig::with_patch`]).  Missing fields fall back to defaults
//! field by field; out-of-range values are clamped by
//! [`ClimateConfig::sanitized`].

use core::cell::RefCell;
use std::sync::Arc;

use chrono::{NaiveTime, Timelike};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::control::preset;
use crate::error::ConfigError;

/// Upper bound for the smoothing window (samples per channel).
pub const MAX_SMOOTH_WINDOW: usize = 32;

/// Top-level groups of the settings document.
const GROUPS: [&str; 9] = [
    "general", "sampling", "targets", "control", "strategy", "sensor", "alerts", "night", "quiet",
];

/// Fan control strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// Two-point control: floor or fully driven.
    #[default]
    Bangbang,
    /// Duty proportional to deviation, no integral/derivative term.
    Proportional,
}

/// Core configuration snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    pub general: GeneralConfig,
    pub sampling: SamplingConfig,
    pub targets: TargetConfig,
    pub control: ActuatorConfig,
    pub strategy: StrategyConfig,
    pub sensor: SensorConfig,
    pub alerts: AlertConfig,
    pub night: NightConfig,
    pub quiet: QuietConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneralConfig {
    /// Display name of the house.
    pub farm_name: String,
    /// Flock age in days (input to the preset resolver).
    pub age_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SamplingConfig {
    /// Control tick period in seconds.
    pub interval_sec: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TargetConfig {
    /// Temperature setpoint (°C).
    pub temp_set: f32,
    /// Hysteresis half-width (°C).
    pub hys: f32,
    /// Light setpoint (lux).
    pub lux_set: f32,
}

/// PWM actuator parameters.  Duty values are on the 0–255 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActuatorConfig {
    /// `false` runs both actuators on/off only.
    pub use_pwm: bool,
    /// Emit `255 - duty` for active-low wiring.
    pub invert_logic: bool,
    pub fan_pwm_freq: u32,
    pub fan_start_boost_duty: f32,
    pub fan_start_boost_ms: f32,
    /// Minimum duty at which the fan keeps turning.
    pub fan_min_duty: f32,
    /// Maximum duty change per second (0 = unlimited).
    pub fan_ramp_per_sec: f32,
    pub led_pwm_freq: u32,
    pub led_min_duty: f32,
    /// Perceptual gamma, 1.0–3.0.
    pub led_gamma: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StrategyConfig {
    pub temp_mode: ControlMode,
    /// Fan duty per °C of deviation.
    pub kp_temp: f32,
    /// LED duty per lux of deviation.
    pub kp_lux: f32,
    pub fan_duty_min: f32,
    pub fan_duty_max: f32,
    pub led_duty_min: f32,
    pub led_duty_max: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SensorConfig {
    pub temp_offset: f32,
    pub lux_offset: f32,
    pub smooth_window_temp: u32,
    pub smooth_window_lux: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertConfig {
    pub enabled: bool,
    pub temp_high: f32,
    pub temp_low: f32,
    pub lux_high: f32,
    pub lux_low: f32,
    /// Breach must persist this long before an alert goes Active.
    pub hold_sec: f32,
    /// Value must stay normal this long before Recovering clears.
    pub recovery_sec: f32,
    /// Reminder period while Active (0 = no reminders).
    pub re_notify_min: f32,
    /// Minimum settle time in Recovering.
    pub grace_normal_sec: f32,
    pub webhook_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NightConfig {
    pub enabled: bool,
    /// Window start, "HH:MM" local time.
    pub start: String,
    /// Window end, "HH:MM" local time; may wrap past midnight.
    pub end: String,
    /// Lux setpoint used while the window is active.
    pub lux_target: f32,
    pub fan_max: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuietConfig {
    pub enabled: bool,
    pub fan_max: f32,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            farm_name: "Broiler House".into(),
            age_days: 0,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { interval_sec: 1.0 }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            temp_set: 27.0,
            hys: 0.7,
            lux_set: 15.0,
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            use_pwm: true,
            invert_logic: false,
            fan_pwm_freq: 25_000, // inaudible for small 5V fans
            fan_start_boost_duty: 255.0,
            fan_start_boost_ms: 200.0,
            fan_min_duty: 50.0,
            fan_ramp_per_sec: 10.0,
            led_pwm_freq: 1_800, // above camera flicker range
            led_min_duty: 10.0,
            led_gamma: 2.2,
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            temp_mode: ControlMode::Bangbang,
            kp_temp: 20.0, // 1 °C ~ +20 duty
            kp_lux: 5.0,   // 5 lx ~ +25 duty
            fan_duty_min: 50.0,
            fan_duty_max: 255.0,
            led_duty_min: 10.0,
            led_duty_max: 255.0,
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            temp_offset: 0.0,
            lux_offset: 0.0,
            smooth_window_temp: 3,
            smooth_window_lux: 6,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            temp_high: 33.0,
            temp_low: 20.0,
            lux_high: 30.0,
            lux_low: 5.0,
            hold_sec: 120.0,
            recovery_sec: 60.0,
            re_notify_min: 30.0,
            grace_normal_sec: 5.0,
            webhook_url: String::new(),
        }
    }
}

impl Default for NightConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start: "21:00".into(),
            end: "05:00".into(),
            lux_target: 8.0,
            fan_max: 160.0,
        }
    }
}

impl Default for QuietConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fan_max: 160.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Import, patching, clamping
// ---------------------------------------------------------------------------

impl ClimateConfig {
    /// Parse an operator settings document.
    ///
    /// Missing fields take their defaults and a group that is not an
    /// object is replaced by its defaults.  A document that is not a JSON
    /// object, or that carries a scalar of the wrong type, is rejected so
    /// the caller can keep its last-known-good snapshot.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            warn!("config: rejected unparsable document ({e})");
            ConfigError::Garbled
        })?;
        Self::from_value(value)
    }

    /// Same as [`from_json`](Self::from_json) for an already-parsed value.
    pub fn from_value(mut value: Value) -> Result<Self, ConfigError> {
        let Value::Object(map) = &mut value else {
            warn!("config: rejected document, top level is not an object");
            return Err(ConfigError::Garbled);
        };
        for group in GROUPS {
            if map.get(group).is_some_and(|g| !g.is_object()) {
                warn!("config: group '{group}' is not an object, using defaults");
                map.remove(group);
            }
        }
        let cfg: Self = serde_json::from_value(value).map_err(|e| {
            warn!("config: rejected document ({e})");
            ConfigError::InvalidDocument
        })?;
        Ok(cfg.sanitized())
    }

    /// Pretty JSON export of this snapshot.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deep-merge a partial document into this snapshot and return the
    /// resulting snapshot.  `self` is left untouched, so a rejected patch
    /// leaves the caller on its current configuration.
    pub fn with_patch(&self, patch: &Value) -> Result<Self, ConfigError> {
        if !patch.is_object() {
            return Err(ConfigError::Garbled);
        }
        let mut base = serde_json::to_value(self).map_err(|_| ConfigError::Corrupted)?;
        merge(&mut base, patch);
        Self::from_value(base)
    }

    /// Write the age-band preset into the targets ("apply preset").
    pub fn with_preset(&self, age_days: u32) -> Self {
        let p = preset::resolve(age_days);
        let mut cfg = self.clone();
        cfg.general.age_days = age_days;
        cfg.targets.temp_set = p.temp;
        cfg.targets.lux_set = p.lux;
        cfg.targets.hys = p.hys;
        cfg
    }

    /// Clamp every field to its valid range.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();

        let s = &mut self.sampling;
        s.interval_sec = finite_or(s.interval_sec, d.sampling.interval_sec).clamp(1.0, 3600.0);

        let t = &mut self.targets;
        t.temp_set = finite_or(t.temp_set, d.targets.temp_set);
        t.hys = non_negative(t.hys, d.targets.hys);
        t.lux_set = finite_or(t.lux_set, d.targets.lux_set);

        let c = &mut self.control;
        let dc = &d.control;
        c.fan_pwm_freq = c.fan_pwm_freq.max(1);
        c.led_pwm_freq = c.led_pwm_freq.max(1);
        c.fan_start_boost_duty = duty(c.fan_start_boost_duty, dc.fan_start_boost_duty);
        c.fan_start_boost_ms = non_negative(c.fan_start_boost_ms, dc.fan_start_boost_ms);
        c.fan_min_duty = duty(c.fan_min_duty, dc.fan_min_duty);
        c.fan_ramp_per_sec = non_negative(c.fan_ramp_per_sec, dc.fan_ramp_per_sec);
        c.led_min_duty = duty(c.led_min_duty, dc.led_min_duty);
        c.led_gamma = finite_or(c.led_gamma, dc.led_gamma).clamp(1.0, 3.0);

        let st = &mut self.strategy;
        let ds = &d.strategy;
        st.kp_temp = non_negative(st.kp_temp, ds.kp_temp);
        st.kp_lux = non_negative(st.kp_lux, ds.kp_lux);
        st.fan_duty_max = duty(st.fan_duty_max, ds.fan_duty_max);
        st.fan_duty_min = duty(st.fan_duty_min, ds.fan_duty_min).min(st.fan_duty_max);
        st.led_duty_max = duty(st.led_duty_max, ds.led_duty_max);
        st.led_duty_min = duty(st.led_duty_min, ds.led_duty_min).min(st.led_duty_max);

        let se = &mut self.sensor;
        se.temp_offset = finite_or(se.temp_offset, 0.0);
        se.lux_offset = finite_or(se.lux_offset, 0.0);
        se.smooth_window_temp = se.smooth_window_temp.clamp(1, MAX_SMOOTH_WINDOW as u32);
        se.smooth_window_lux = se.smooth_window_lux.clamp(1, MAX_SMOOTH_WINDOW as u32);

        let a = &mut self.alerts;
        let da = &d.alerts;
        a.temp_high = finite_or(a.temp_high, da.temp_high);
        a.temp_low = finite_or(a.temp_low, da.temp_low);
        a.lux_high = finite_or(a.lux_high, da.lux_high);
        a.lux_low = finite_or(a.lux_low, da.lux_low);
        a.hold_sec = non_negative(a.hold_sec, da.hold_sec);
        a.recovery_sec = non_negative(a.recovery_sec, da.recovery_sec);
        a.re_notify_min = non_negative(a.re_notify_min, da.re_notify_min);
        a.grace_normal_sec = non_negative(a.grace_normal_sec, da.grace_normal_sec);

        let n = &mut self.night;
        if parse_hhmm(&n.start).is_none() {
            warn!("config: night start '{}' unparsable, using default", n.start);
            n.start = d.night.start.clone();
        }
        if parse_hhmm(&n.end).is_none() {
            warn!("config: night end '{}' unparsable, using default", n.end);
            n.end = d.night.end.clone();
        }
        n.lux_target = finite_or(n.lux_target, d.night.lux_target);
        n.fan_max = duty(n.fan_max, d.night.fan_max);

        self.quiet.fan_max = duty(self.quiet.fan_max, d.quiet.fan_max);

        self
    }

    /// Range check used before persisting.  Any output of
    /// [`sanitized`](Self::sanitized) passes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let st = &self.strategy;
        if !(0.0..=255.0).contains(&st.fan_duty_max) || st.fan_duty_min > st.fan_duty_max {
            return Err(ConfigError::ValidationFailed(
                "fan duty limits must satisfy 0 <= min <= max <= 255",
            ));
        }
        if !(0.0..=255.0).contains(&st.led_duty_max) || st.led_duty_min > st.led_duty_max {
            return Err(ConfigError::ValidationFailed(
                "led duty limits must satisfy 0 <= min <= max <= 255",
            ));
        }
        if !(1.0..=3.0).contains(&self.control.led_gamma) {
            return Err(ConfigError::ValidationFailed("led_gamma must be 1.0–3.0"));
        }
        let a = &self.alerts;
        if a.hold_sec < 0.0 || a.recovery_sec < 0.0 || a.re_notify_min < 0.0 || a.grace_normal_sec < 0.0
        {
            return Err(ConfigError::ValidationFailed("alert timers must be >= 0"));
        }
        if self.sensor.smooth_window_temp == 0 || self.sensor.smooth_window_lux == 0 {
            return Err(ConfigError::ValidationFailed("smoothing windows must be >= 1"));
        }
        if self.sampling.interval_sec < 1.0 {
            return Err(ConfigError::ValidationFailed("interval_sec must be >= 1"));
        }
        Ok(())
    }

    /// Tick period in milliseconds.
    pub fn interval_ms(&self) -> u64 {
        (self.sampling.interval_sec * 1000.0).round() as u64
    }
}

/// Parse "HH:MM" into minutes after midnight.
pub fn parse_hhmm(text: &str) -> Option<u16> {
    let t = NaiveTime::parse_from_str(text.trim(), "%H:%M").ok()?;
    Some((t.hour() * 60 + t.minute()) as u16)
}

// ---------------------------------------------------------------------------
// Shared snapshot handle
// ---------------------------------------------------------------------------

/// Cloneable handle to the current configuration snapshot.
///
/// Writers swap the whole `Arc`; readers take one `Arc` per tick, so a
/// tick sees either the old or the new snapshot, never a mix.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<Mutex<CriticalSectionRawMutex, RefCell<Arc<ClimateConfig>>>>,
}

impl ConfigHandle {
    pub fn new(config: ClimateConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RefCell::new(Arc::new(config)))),
        }
    }

    pub fn snapshot(&self) -> Arc<ClimateConfig> {
        self.inner.lock(|c| c.borrow().clone())
    }

    /// Install `config` as the new snapshot.
    pub fn replace(&self, config: ClimateConfig) -> Arc<ClimateConfig> {
        let next = Arc::new(config);
        self.inner.lock(|c| *c.borrow_mut() = next.clone());
        next
    }

    /// Read-modify-write under the lock.  On error the current snapshot
    /// stays in place.
    pub fn update<E>(
        &self,
        f: impl FnOnce(&ClimateConfig) -> Result<ClimateConfig, E>,
    ) -> Result<Arc<ClimateConfig>, E> {
        self.inner.lock(|c| {
            let next = Arc::new(f(&c.borrow())?);
            *c.borrow_mut() = next.clone();
            Ok(next)
        })
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(ClimateConfig::default())
    }
}

fn merge(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(b), Value::Object(p)) => {
            for (k, v) in p {
                match b.get_mut(k) {
                    Some(slot) if slot.is_object() && v.is_object() => merge(slot, v),
                    _ => {
                        b.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (b, p) => *b = p.clone(),
    }
}

fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() { v } else { fallback }
}

fn non_negative(v: f32, fallback: f32) -> f32 {
    finite_or(v, fallback).max(0.0)
}

fn duty(v: f32, fallback: f32) -> f32 {
    finite_or(v, fallback).clamp(0.0, 255.0).round()
}
