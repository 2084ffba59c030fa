//! Deviation → actuator duty mapping.
//!
//! One call to [`map`] per actuator per tick runs the pipeline:
//!
//! ```text
//!  strategy (bang-bang | proportional)
//!      │   duty in [floor, ceiling]
//!      ▼
//!  start-boost (fan)  ──  forced boost duty for boost_ms after leaving the floor
//!      ▼
//!  ramp limit (fan)   ──  |Δduty| <= ramp_per_sec × tick
//!      ▼
//!  [mode overlay caps, applied by the caller]
//!      ▼
//!  output stage       ──  gamma (LED) → on/off (no PWM) → invert
//! ```
//!
//! The carried [`ActuatorRamp`] holds the previous emitted duty, the
//! boost window and the bang-bang latch, so the mapping is a pure function
//! of (input, limits, ramp state, now).

use serde::Serialize;

use crate::config::{ClimateConfig, ControlMode};

/// Which side of the setpoint needs correcting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Act when the value is above the setpoint (fan vs. heat).
    Above,
    /// Act when the value is below the setpoint (LED vs. darkness).
    Below,
}

/// Measured value against its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlInput {
    pub measured: f32,
    pub setpoint: f32,
    pub hysteresis: f32,
    pub direction: Direction,
}

impl ControlInput {
    /// Signed distance from the setpoint, positive when correction is needed.
    pub fn deviation(&self) -> f32 {
        match self.direction {
            Direction::Above => self.measured - self.setpoint,
            Direction::Below => self.setpoint - self.measured,
        }
    }

    /// Outside the hysteresis band on the side needing correction.
    fn beyond_band(&self) -> bool {
        match self.direction {
            Direction::Above => self.measured > self.setpoint + self.hysteresis,
            Direction::Below => self.measured < self.setpoint - self.hysteresis,
        }
    }

    /// Back at (or past) the setpoint.
    fn settled(&self) -> bool {
        match self.direction {
            Direction::Above => self.measured <= self.setpoint,
            Direction::Below => self.measured >= self.setpoint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    BangBang,
    /// `gain` is duty units per unit of deviation.
    Proportional { gain: f32 },
}

impl Strategy {
    pub fn fan(cfg: &ClimateConfig) -> Self {
        match cfg.strategy.temp_mode {
            ControlMode::Bangbang => Self::BangBang,
            ControlMode::Proportional => Self::Proportional {
                gain: cfg.strategy.kp_temp,
            },
        }
    }

    pub fn led(cfg: &ClimateConfig) -> Self {
        Self::Proportional {
            gain: cfg.strategy.kp_lux,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartBoost {
    pub duty: u8,
    pub duration_ms: u64,
}

/// Resolved per-actuator limits for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorLimits {
    /// Hard floor while enabled; may be 0.
    pub duty_min: u8,
    pub duty_max: u8,
    pub boost: Option<StartBoost>,
    /// `None` disables ramp limiting.
    pub ramp_per_sec: Option<f32>,
    /// 1.0 is identity.
    pub gamma: f32,
    pub invert: bool,
    pub use_pwm: bool,
    pub freq_hz: u32,
}

impl ActuatorLimits {
    pub fn fan(cfg: &ClimateConfig) -> Self {
        let c = &cfg.control;
        let s = &cfg.strategy;
        let duty_max = to_duty(s.fan_duty_max);
        Self {
            duty_min: to_duty(c.fan_min_duty.max(s.fan_duty_min)).min(duty_max),
            duty_max,
            boost: (c.fan_start_boost_ms > 0.0).then(|| StartBoost {
                duty: to_duty(c.fan_start_boost_duty),
                duration_ms: c.fan_start_boost_ms.round() as u64,
            }),
            ramp_per_sec: (c.fan_ramp_per_sec > 0.0).then_some(c.fan_ramp_per_sec),
            gamma: 1.0,
            invert: c.invert_logic,
            use_pwm: c.use_pwm,
            freq_hz: c.fan_pwm_freq,
        }
    }

    pub fn led(cfg: &ClimateConfig) -> Self {
        let c = &cfg.control;
        let s = &cfg.strategy;
        let duty_max = to_duty(s.led_duty_max);
        Self {
            duty_min: to_duty(c.led_min_duty.max(s.led_duty_min)).min(duty_max),
            duty_max,
            boost: None,
            ramp_per_sec: None,
            gamma: c.led_gamma,
            invert: c.invert_logic,
            use_pwm: c.use_pwm,
            freq_hz: c.led_pwm_freq,
        }
    }
}

/// Carried state of one actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ActuatorRamp {
    /// Last logical duty emitted (before the output stage).
    pub last_duty: Option<u8>,
    /// Monotonic instant at which the running start-boost ends.
    pub boost_until_ms: Option<u64>,
    /// Bang-bang latch: currently driving at full duty.
    pub engaged: bool,
}

impl ActuatorRamp {
    /// Record the duty that was finally emitted after overlay caps.
    pub fn settle(&mut self, duty: u8) {
        self.last_duty = Some(duty);
    }

    /// Forget history so the next run starts from rest (re-arms boost).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Ramp state of both actuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RampState {
    pub fan: ActuatorRamp,
    pub led: ActuatorRamp,
}

impl RampState {
    pub fn reset(&mut self) {
        self.fan.reset();
        self.led.reset();
    }
}

/// Raw strategy duty in `[duty_min, duty_max]`.  Updates the bang-bang
/// latch in `ramp`.
pub fn strategy_duty(
    input: &ControlInput,
    strategy: Strategy,
    limits: &ActuatorLimits,
    ramp: &mut ActuatorRamp,
) -> u8 {
    let (floor, ceiling) = (limits.duty_min, limits.duty_max);
    match strategy {
        Strategy::BangBang => {
            if input.beyond_band() {
                ramp.engaged = true;
            } else if input.settled() {
                ramp.engaged = false;
            }
            if ramp.engaged { ceiling } else { floor }
        }
        Strategy::Proportional { gain } => {
            ramp.engaged = false;
            let raw = f32::from(floor) + gain * input.deviation().max(0.0);
            raw.clamp(f32::from(floor), f32::from(ceiling)).round() as u8
        }
    }
}

/// Full strategy → boost → ramp pipeline for one actuator.
///
/// `dt_secs` is the tick length.  The ramp step is `rate × dt` rounded
/// down to whole duty units, so a budget below one unit holds the duty.
pub fn map(
    input: &ControlInput,
    strategy: Strategy,
    limits: &ActuatorLimits,
    ramp: &mut ActuatorRamp,
    now_ms: u64,
    dt_secs: f32,
) -> u8 {
    let (floor, ceiling) = (limits.duty_min, limits.duty_max);
    let target = strategy_duty(input, strategy, limits, ramp);

    // Lift history into the allowed band so ramping never passes through
    // the sub-floor range.
    let prev = ramp.last_duty.map(|d| d.clamp(floor, ceiling));
    let resting = prev.is_none_or(|d| d <= floor);

    if let Some(boost) = limits.boost.filter(|b| b.duration_ms > 0) {
        if target <= floor {
            ramp.boost_until_ms = None;
        } else if resting && ramp.boost_until_ms.is_none() {
            ramp.boost_until_ms = Some(now_ms.saturating_add(boost.duration_ms));
        }
        if let Some(until) = ramp.boost_until_ms {
            if now_ms < until {
                let out = boost.duty.max(target).min(ceiling);
                ramp.last_duty = Some(out);
                return out;
            }
            ramp.boost_until_ms = None;
        }
    }

    let out = match (prev, limits.ramp_per_sec) {
        (Some(p), Some(rate)) => {
            let step = (rate * dt_secs).floor().clamp(0.0, 255.0) as u8;
            target.clamp(p.saturating_sub(step), p.saturating_add(step))
        }
        _ => target,
    };
    ramp.last_duty = Some(out);
    out
}

/// Continuous gamma curve on the 0–255 scale.
pub fn gamma_curve(duty: f32, gamma: f32) -> f32 {
    if gamma <= 1.0 {
        return duty;
    }
    255.0 * (duty / 255.0).clamp(0.0, 1.0).powf(1.0 / gamma)
}

/// Perceptual brightness correction, identity at `gamma = 1`.
pub fn gamma_correct(duty: u8, gamma: f32) -> u8 {
    if gamma <= 1.0 {
        return duty;
    }
    gamma_curve(f32::from(duty), gamma).round().clamp(0.0, 255.0) as u8
}

/// Output stage: gamma, on/off when PWM is disabled, then inversion.
pub fn finish(duty: u8, limits: &ActuatorLimits) -> u8 {
    let d = if limits.use_pwm {
        gamma_correct(duty, limits.gamma)
    } else if duty > limits.duty_min {
        255
    } else {
        0
    };
    if limits.invert { 255 - d } else { d }
}

fn to_duty(v: f32) -> u8 {
    v.clamp(0.0, 255.0).round() as u8
}
