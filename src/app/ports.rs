//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ClimateService (domain)
//! ```
//!
//! Driven adapters (sensor ingestion, PWM actuators, clocks, event sinks,
//! configuration storage, notification delivery) implement these traits.
//! The [`ClimateService`](super::service::ClimateService) consumes them via
//! generics, so the domain core never touches I/O directly.
//!
//! ## Contract notes
//!
//! - **SensorPort** must never block: no sample is reported as `None`.
//! - **NotificationPort** must never block: a full queue is an error, not a wait.
//! - **ConfigPort** implementations MUST validate before persisting.

use crate::app::cycle::DutyCommand;
use crate::config::ClimateConfig;
use crate::error::{ConfigError, NotifyError};
use crate::notify::Notification;
use crate::sensors::RawSample;

// ───────────────────────────────────────────────────────────────
// Sensor port (ingestion boundary → domain)
// ───────────────────────────────────────────────────────────────

pub trait SensorPort {
    /// Most recent sample not yet consumed, or `None` if nothing new
    /// arrived since the last call.
    fn read_sample(&mut self) -> Option<RawSample>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (domain → PWM hardware)
// ───────────────────────────────────────────────────────────────

pub trait ActuatorPort {
    /// Realise one duty command (0–255 duties plus frequencies).
    fn apply(&mut self, command: &DutyCommand);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Monotonic milliseconds; never goes backwards.
    fn monotonic_ms(&self) -> u64;

    /// Local wall-clock minutes after midnight, `None` when unknown.
    fn minute_of_day(&self) -> Option<u16>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Notifications
// ───────────────────────────────────────────────────────────────

/// Tick side: hand an intent to the out-of-band dispatcher.
pub trait NotificationPort {
    fn enqueue(&mut self, notification: Notification) -> Result<(), NotifyError>;
}

/// Dispatcher side: deliver one notification (webhook, log, ...).
/// Implementations may block; they run off the control loop.
pub trait NotificationSink {
    fn deliver(&mut self, notification: &Notification) -> Result<(), NotifyError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists configuration snapshots keyed by a string id.
///
/// Implementations MUST validate before persisting and reject invalid
/// ranges with [`ConfigError::ValidationFailed`].
pub trait ConfigPort {
    /// [`ConfigError::NotFound`] when nothing is stored under `key`.
    fn load(&self, key: &str) -> Result<ClimateConfig, ConfigError>;

    fn save(&self, key: &str, config: &ClimateConfig) -> Result<(), ConfigError>;
}

impl<T: ConfigPort + ?Sized> ConfigPort for &T {
    fn load(&self, key: &str) -> Result<ClimateConfig, ConfigError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, config: &ClimateConfig) -> Result<(), ConfigError> {
        (**self).save(key, config)
    }
}
