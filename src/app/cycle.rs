//! One control tick as a pure function.
//!
//! ```text
//!  RawSample ──▶ smoother ──▶ SmoothedSample ─┬─▶ duty map (fan) ─▶ overlay ─▶ output stage ─┐
//!                                             ├─▶ duty map (LED) ─────────────▶ output stage ─┼─▶ DutyCommand
//!                                             └─▶ alert bank ─────────────────▶ notifications ┘
//! ```
//!
//! [`run_cycle`] takes the prior [`EngineState`] by reference and returns
//! the next one, so the tick can be replayed and tested without a live
//! sensor, clock or actuator.

use heapless::Vec;
use serde::Serialize;

use crate::alert::{AlertBank, AlertStage};
use crate::config::ClimateConfig;
use crate::control::duty::{self, ActuatorLimits, ControlInput, Direction, RampState, Strategy};
use crate::control::overlay::{self, ActiveModes};
use crate::control::status::{self, Badge};
use crate::notify::Notification;
use crate::sensors::{RawSample, SampleSmoother, SmoothedSample, TrendWindow};

/// Emitted once per tick, consumed by the actuator boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DutyCommand {
    pub fan_duty: u8,
    pub led_duty: u8,
    pub fan_freq_hz: u32,
    pub led_freq_hz: u32,
}

impl DutyCommand {
    /// Both actuators at logical zero (inverted for active-low wiring).
    pub fn idle(cfg: &ClimateConfig) -> Self {
        let off = if cfg.control.invert_logic { 255 } else { 0 };
        Self {
            fan_duty: off,
            led_duty: off,
            fan_freq_hz: cfg.control.fan_pwm_freq,
            led_freq_hz: cfg.control.led_pwm_freq,
        }
    }
}

/// Everything carried from one tick to the next.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub smoother: SampleSmoother,
    pub ramp: RampState,
    pub alerts: AlertBank,
    pub temp_trend: TrendWindow,
    pub lux_trend: TrendWindow,
    pub last_command: Option<DutyCommand>,
}

impl EngineState {
    /// Forget actuator history (after an explicit stop/start of the
    /// actuators), keeping alerts and smoothing intact.
    pub fn reset_actuators(&mut self) {
        self.ramp.reset();
        self.last_command = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleInput {
    pub now_ms: u64,
    pub minute_of_day: Option<u16>,
    pub sample: Option<RawSample>,
}

/// Derived values of a tick that consumed a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub smoothed: SmoothedSample,
    /// Fan duty after the overlay, before the output stage.
    pub fan_logical: u8,
    pub led_logical: u8,
    pub modes: ActiveModes,
    pub temp_badge: Badge,
    pub lux_badge: Badge,
    pub temp_alert: AlertStage,
    pub lux_alert: AlertStage,
}

#[derive(Debug, Clone)]
pub struct CycleOutput {
    pub state: EngineState,
    pub command: DutyCommand,
    pub notifications: Vec<Notification, 4>,
    /// `None` when the tick had no new sample.
    pub report: Option<CycleReport>,
}

/// Run one tick against one configuration snapshot.
pub fn run_cycle(input: &CycleInput, cfg: &ClimateConfig, prior: &EngineState) -> CycleOutput {
    let mut state = prior.clone();

    let Some(raw) = input.sample else {
        // No new reading: hold the previous command and alert state.
        let command = prior.last_command.unwrap_or_else(|| DutyCommand::idle(cfg));
        return CycleOutput {
            state,
            command,
            notifications: Vec::new(),
            report: None,
        };
    };

    let smoothed = state.smoother.smooth(&raw, &cfg.sensor);
    state.temp_trend.push(smoothed.temperature);
    state.lux_trend.push(smoothed.lux);

    let modes = ActiveModes::evaluate(cfg, input.minute_of_day);
    let dt_secs = cfg.sampling.interval_sec;

    // Fan: temperature above the setpoint needs correction.
    let fan_limits = ActuatorLimits::fan(cfg);
    let fan_input = ControlInput {
        measured: smoothed.temperature,
        setpoint: cfg.targets.temp_set,
        hysteresis: cfg.targets.hys,
        direction: Direction::Above,
    };
    let fan_raw = duty::map(
        &fan_input,
        Strategy::fan(cfg),
        &fan_limits,
        &mut state.ramp.fan,
        input.now_ms,
        dt_secs,
    );
    let fan_logical = overlay::apply(fan_raw, modes, cfg);
    state.ramp.fan.settle(fan_logical);

    // LED: light below the (night) target needs correction.
    let led_limits = ActuatorLimits::led(cfg);
    let lux_set = if modes.night {
        cfg.night.lux_target
    } else {
        cfg.targets.lux_set
    };
    let led_input = ControlInput {
        measured: smoothed.lux,
        setpoint: lux_set,
        hysteresis: cfg.targets.hys,
        direction: Direction::Below,
    };
    let led_logical = duty::map(
        &led_input,
        Strategy::led(cfg),
        &led_limits,
        &mut state.ramp.led,
        input.now_ms,
        dt_secs,
    );

    let command = DutyCommand {
        fan_duty: duty::finish(fan_logical, &fan_limits),
        led_duty: duty::finish(led_logical, &led_limits),
        fan_freq_hz: fan_limits.freq_hz,
        led_freq_hz: led_limits.freq_hz,
    };

    let (alerts, notifications) = state.alerts.step(&smoothed, &cfg.alerts, input.now_ms);
    state.alerts = alerts;
    state.last_command = Some(command);

    let hys = cfg.targets.hys;
    let report = CycleReport {
        smoothed,
        fan_logical,
        led_logical,
        modes,
        temp_badge: status::classify(
            smoothed.temperature - cfg.targets.temp_set,
            hys,
            state.temp_trend.slope(),
        ),
        lux_badge: status::classify(smoothed.lux - lux_set, hys, state.lux_trend.slope()),
        temp_alert: state.alerts.temperature_stage(),
        lux_alert: state.alerts.lux_stage(),
    };

    CycleOutput {
        state,
        command,
        notifications,
        report: Some(report),
    }
}
