//! Application service: the hexagonal core.
//!
//! [`ClimateService`] owns the carried engine state and a handle to the
//! live configuration.  Each tick it takes one configuration snapshot,
//! runs the pure [`run_cycle`], and pushes the results out through the
//! ports: duty command to the actuators, notification intents to the
//! dispatcher queue, telemetry to the event sink.
//!
//! ```text
//!  SensorPort ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!   ClockPort ──▶ │     ClimateService      │ ──▶ NotificationPort
//! ActuatorPort ◀──│ smoother · duty · alert │
//!                 └─────────────────────────┘
//! ```

use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::{ClimateConfig, ConfigHandle};
use crate::control::preset;
use crate::error::{ConfigError, Error, Result};

use super::commands::AppCommand;
use super::cycle::{CycleInput, DutyCommand, EngineState, run_cycle};
use super::events::{AppEvent, ConfigSource, TelemetryData};
use super::ports::{ActuatorPort, ClockPort, ConfigPort, EventSink, NotificationPort, SensorPort};

/// Storage key of the live configuration.
pub const CONFIG_KEY: &str = "climate";

/// Debounce between the last configuration change and the auto-save.
pub const AUTO_SAVE_DELAY_MS: u64 = 5_000;

// ───────────────────────────────────────────────────────────────
// ClimateService
// ───────────────────────────────────────────────────────────────

pub struct ClimateService {
    config: ConfigHandle,
    /// Snapshot the service last acted on, to spot external swaps.
    seen: Arc<ClimateConfig>,
    state: EngineState,
    tick_count: u64,
    last_now_ms: u64,
    config_dirty: bool,
    dirty_since_ms: u64,
    /// Explicit save requested; skips the debounce once.
    save_requested: bool,
}

impl ClimateService {
    pub fn new(config: ConfigHandle) -> Self {
        Self::resume(config, EngineState::default())
    }

    /// Continue from state returned by [`into_state`](Self::into_state):
    /// ramp, boost and alert timers carry on where they stopped.
    pub fn resume(config: ConfigHandle, state: EngineState) -> Self {
        let seen = config.snapshot();
        Self {
            config,
            seen,
            state,
            tick_count: 0,
            last_now_ms: 0,
            config_dirty: false,
            dirty_since_ms: 0,
            save_requested: false,
        }
    }

    /// Load the stored configuration, falling back to defaults when
    /// nothing usable is stored.
    pub fn load_config(store: &impl ConfigPort, key: &str) -> ClimateConfig {
        match store.load(key) {
            Ok(cfg) => {
                info!("Config loaded from '{key}'");
                cfg
            }
            Err(ConfigError::NotFound) => {
                info!("No stored config under '{key}', using defaults");
                ClimateConfig::default()
            }
            Err(e) => {
                warn!("Stored config under '{key}' unusable ({e}), using defaults");
                ClimateConfig::default()
            }
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        let interval_ms = self.seen.interval_ms();
        sink.emit(&AppEvent::Started { interval_ms });
        info!("ClimateService started, tick every {interval_ms} ms");
    }

    /// Hand back the carried state for a later [`resume`](Self::resume).
    pub fn into_state(self) -> EngineState {
        self.state
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: sample → duty command → alerts.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`], which avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        clock: &impl ClockPort,
        notifier: &mut impl NotificationPort,
        sink: &mut impl EventSink,
    ) -> DutyCommand {
        let cfg = self.config.snapshot();
        let now_ms = clock.monotonic_ms();
        self.tick_count += 1;
        self.last_now_ms = now_ms;

        if !Arc::ptr_eq(&cfg, &self.seen) {
            self.seen = cfg.clone();
            self.mark_config_dirty();
            sink.emit(&AppEvent::ConfigChanged(ConfigSource::External));
        }

        let input = CycleInput {
            now_ms,
            minute_of_day: clock.minute_of_day(),
            sample: hw.read_sample(),
        };
        let out = run_cycle(&input, &cfg, &self.state);
        hw.apply(&out.command);

        for n in &out.notifications {
            sink.emit(&AppEvent::Alert(*n));
            if let Err(e) = notifier.enqueue(*n) {
                warn!("Tick {}: notification not queued: {e}", self.tick_count);
            }
        }

        match out.report {
            Some(report) => {
                sink.emit(&AppEvent::Telemetry(TelemetryData::new(
                    self.tick_count,
                    &report,
                    out.command,
                )));
            }
            None => debug!("Tick {}: no new sample, holding command", self.tick_count),
        }

        self.state = out.state;
        out.command
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply an operator command between ticks.  A rejected document or
    /// patch leaves the live snapshot untouched.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let outcome = match cmd {
            AppCommand::UpdateConfig(patch) => self
                .config
                .update(|c| c.with_patch(&patch))
                .map(|next| (next, ConfigSource::Patch)),
            AppCommand::ApplyPreset(age) => {
                info!("Applying preset for day {age} ({})", preset::resolve(age).phase);
                let next = self.config.update::<ConfigError>(|c| Ok(c.with_preset(age)));
                next.map(|n| (n, ConfigSource::Preset(age)))
            }
            AppCommand::ImportConfig(text) => ClimateConfig::from_json(&text)
                .map(|cfg| (self.config.replace(cfg), ConfigSource::Import)),
            AppCommand::ResetDefaults => Ok((
                self.config.replace(ClimateConfig::default()),
                ConfigSource::Defaults,
            )),
            AppCommand::ExportConfig => {
                sink.emit(&AppEvent::ConfigExported(self.config.snapshot().to_json()));
                return Ok(());
            }
            AppCommand::SaveConfig => {
                self.config_dirty = true;
                self.save_requested = true;
                info!("Explicit config save requested (will flush on next auto-save check)");
                return Ok(());
            }
            AppCommand::ResetActuators => {
                self.state.reset_actuators();
                hw.apply(&DutyCommand::idle(&self.config.snapshot()));
                sink.emit(&AppEvent::ActuatorsReset);
                info!("Actuators reset, start-boost re-armed");
                return Ok(());
            }
        };

        match outcome {
            Ok((next, source)) => {
                self.seen = next;
                self.mark_config_dirty();
                sink.emit(&AppEvent::ConfigChanged(source));
                info!("Configuration updated ({source:?})");
                Ok(())
            }
            Err(e) => {
                warn!("Configuration change refused: {e}");
                sink.emit(&AppEvent::ConfigRejected(e));
                Err(Error::Config(e))
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Total control ticks executed since start or resume.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> Arc<ClimateConfig> {
        self.config.snapshot()
    }

    pub fn config_handle(&self) -> &ConfigHandle {
        &self.config
    }

    // ── Config dirty-flag management ──────────────────────────

    /// Mark the config as modified; restarts the auto-save debounce.
    pub fn mark_config_dirty(&mut self) {
        self.config_dirty = true;
        self.dirty_since_ms = self.last_now_ms;
    }

    /// Save once [`AUTO_SAVE_DELAY_MS`] passed since the last change.
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, store: &impl ConfigPort, sink: &mut impl EventSink) -> bool {
        if !self.config_dirty {
            return false;
        }
        if !self.save_requested && self.last_now_ms.saturating_sub(self.dirty_since_ms) < AUTO_SAVE_DELAY_MS {
            return false;
        }
        self.save(store, sink, "auto-saved")
    }

    /// Force-save if dirty (call before stopping).
    pub fn force_save_if_dirty(&mut self, store: &impl ConfigPort, sink: &mut impl EventSink) {
        if self.config_dirty {
            self.save(store, sink, "force-saved before shutdown");
        }
    }

    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    fn save(&mut self, store: &impl ConfigPort, sink: &mut impl EventSink, what: &str) -> bool {
        match store.save(CONFIG_KEY, &self.config.snapshot()) {
            Ok(()) => {
                self.config_dirty = false;
                self.save_requested = false;
                sink.emit(&AppEvent::ConfigSaved);
                info!("Config {what}");
                true
            }
            Err(e) => {
                warn!("Config save failed: {e}");
                false
            }
        }
    }
}
