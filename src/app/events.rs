//! Outbound application events.
//!
//! The [`ClimateService`](super::service::ClimateService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them (log, dashboard feed, ...).

use serde::Serialize;

use crate::alert::AlertStage;
use crate::app::cycle::{CycleReport, DutyCommand};
use crate::control::status::Badge;
use crate::error::ConfigError;
use crate::notify::Notification;

/// Where a configuration change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Patch,
    Preset(u32),
    Import,
    Defaults,
    /// Swapped through a shared handle outside the service.
    External,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (tick period in ms).
    Started { interval_ms: u64 },

    /// Per-tick telemetry snapshot.
    Telemetry(TelemetryData),

    /// An alert notification was raised this tick.
    Alert(Notification),

    /// A new configuration snapshot is live.
    ConfigChanged(ConfigSource),

    /// A configuration document or patch was refused; the previous
    /// snapshot stays live.
    ConfigRejected(ConfigError),

    /// Pretty JSON of the live configuration.
    ConfigExported(String),

    /// Configuration persisted.
    ConfigSaved,

    /// Ramp/boost history cleared and actuators switched off.
    ActuatorsReset,
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryData {
    pub tick: u64,
    pub timestamp_ms: u64,
    pub temperature: f32,
    pub lux: f32,
    pub command: DutyCommand,
    pub temp_badge: Badge,
    pub lux_badge: Badge,
    pub temp_alert: AlertStage,
    pub lux_alert: AlertStage,
    pub night: bool,
    pub quiet: bool,
}

impl TelemetryData {
    pub fn new(tick: u64, report: &CycleReport, command: DutyCommand) -> Self {
        Self {
            tick,
            timestamp_ms: report.smoothed.timestamp_ms,
            temperature: report.smoothed.temperature,
            lux: report.smoothed.lux,
            command,
            temp_badge: report.temp_badge,
            lux_badge: report.lux_badge,
            temp_alert: report.temp_alert,
            lux_alert: report.lux_alert,
            night: report.modes.night,
            quiet: report.modes.quiet,
        }
    }
}
