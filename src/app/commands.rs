//! Inbound commands to the application service.
//!
//! These represent operator actions (settings page, CLI, remote API) that
//! the [`ClimateService`](super::service::ClimateService) applies between
//! ticks.

use serde_json::Value;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Deep-merge a partial settings document into the live snapshot.
    UpdateConfig(Value),

    /// Write the age-band preset for `age_days` into the targets.
    ApplyPreset(u32),

    /// Replace the configuration with an imported document.
    ImportConfig(String),

    /// Emit the current configuration as JSON.
    ExportConfig,

    /// Restore factory defaults.
    ResetDefaults,

    /// Persist the current config at the next auto-save check.
    SaveConfig,

    /// Forget ramp/boost history and switch the actuators off.
    ResetActuators,
}
