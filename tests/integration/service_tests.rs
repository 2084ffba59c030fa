//! Integration tests for the ClimateService → ports pipeline: ticks,
//! commands, persistence, resume and out-of-band notification delivery.

use std::sync::{Arc, Mutex};

use super::mock_hw::{ActuatorCall, ManualClock, MockHouse, RecordingNotifier, RecordingSink};

use broiler_climate::adapters::memory_store::MemoryConfigStore;
use broiler_climate::alert::AlertStage;
use broiler_climate::app::commands::AppCommand;
use broiler_climate::app::events::{AppEvent, ConfigSource};
use broiler_climate::app::ports::{ConfigPort, NotificationSink};
use broiler_climate::app::service::{AUTO_SAVE_DELAY_MS, CONFIG_KEY, ClimateService};
use broiler_climate::config::{ClimateConfig, ConfigHandle};
use broiler_climate::error::{ConfigError, NotifyError};
use broiler_climate::notify::dispatcher::{Dispatcher, RetryPolicy};
use broiler_climate::notify::{Notification, NotificationQueue};
use serde_json::json;

struct Rig {
    service: ClimateService,
    house: MockHouse,
    clock: ManualClock,
    notifier: RecordingNotifier,
    sink: RecordingSink,
}

impl Rig {
    fn new(cfg: ClimateConfig) -> Self {
        let mut sink = RecordingSink::new();
        let mut service = ClimateService::new(ConfigHandle::new(cfg));
        service.start(&mut sink);
        Self {
            service,
            house: MockHouse::new(),
            clock: ManualClock::new(),
            notifier: RecordingNotifier::new(),
            sink,
        }
    }

    fn tick_with(&mut self, temperature: f32, lux: f32) {
        self.house.push(temperature, lux);
        self.tick();
    }

    fn tick(&mut self) {
        self.service
            .tick(&mut self.house, &self.clock, &mut self.notifier, &mut self.sink);
        self.clock.advance(1_000);
    }

    fn command(&mut self, cmd: AppCommand) -> broiler_climate::error::Result<()> {
        self.service.handle_command(cmd, &mut self.house, &mut self.sink)
    }
}

fn fast_alerts() -> ClimateConfig {
    let mut cfg = ClimateConfig::default();
    cfg.sensor.smooth_window_temp = 1;
    cfg.alerts.hold_sec = 10.0;
    cfg
}

// ── Tick ──────────────────────────────────────────────────────

#[test]
fn tick_drives_actuators_and_reports_telemetry() {
    let mut rig = Rig::new(ClimateConfig::default());
    rig.tick_with(27.0, 15.0);

    assert_eq!(rig.house.calls.len(), 1);
    let cmd = rig.house.last_command().unwrap();
    assert_eq!(cmd.fan_freq_hz, 25_000);
    assert_eq!(cmd.led_freq_hz, 1_800);
    assert_eq!(rig.sink.telemetry_count(), 1);
    assert!(matches!(rig.sink.events[0], AppEvent::Started { interval_ms: 1_000 }));
}

#[test]
fn missing_sample_reapplies_last_command_without_telemetry() {
    let mut rig = Rig::new(ClimateConfig::default());
    rig.tick_with(30.0, 15.0);
    let first = rig.house.last_command().unwrap();

    rig.house.push_gap();
    rig.tick();

    assert_eq!(rig.house.calls.len(), 2);
    assert_eq!(rig.house.calls[1], ActuatorCall::Apply(first));
    assert_eq!(rig.sink.telemetry_count(), 1);
}

#[test]
fn alert_notification_reaches_notifier_and_sink() {
    let mut rig = Rig::new(fast_alerts());
    for _ in 0..11 {
        rig.tick_with(35.0, 15.0);
    }
    assert_eq!(rig.notifier.sent.len(), 1);
    assert_eq!(rig.service.state().alerts.temperature_stage(), AlertStage::Active);
    let alerts = rig
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::Alert(_)))
        .count();
    assert_eq!(alerts, 1);
}

#[test]
fn full_notification_queue_never_stalls_the_tick() {
    let mut rig = Rig::new(fast_alerts());
    rig.notifier.refuse = true;
    for _ in 0..15 {
        rig.tick_with(35.0, 15.0);
    }
    assert_eq!(rig.house.calls.len(), 15);
    assert_eq!(rig.service.state().alerts.temperature_stage(), AlertStage::Active);
}

// ── Configuration ─────────────────────────────────────────────

#[test]
fn patch_is_visible_on_the_next_tick_only() {
    let mut rig = Rig::new(ClimateConfig::default());
    rig.command(AppCommand::UpdateConfig(json!({ "control": { "fanPwmFreq": 20000 } })))
        .unwrap();
    rig.tick_with(27.0, 15.0);
    assert_eq!(rig.house.last_command().unwrap().fan_freq_hz, 20_000);
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::ConfigChanged(ConfigSource::Patch))
    );
}

#[test]
fn external_swap_is_detected_once() {
    let mut rig = Rig::new(ClimateConfig::default());
    let handle = rig.service.config_handle().clone();
    rig.tick_with(27.0, 15.0);

    let mut cfg = (*handle.snapshot()).clone();
    cfg.control.led_pwm_freq = 2_000;
    handle.replace(cfg);
    rig.tick_with(27.0, 15.0);
    rig.tick_with(27.0, 15.0);

    let external = rig
        .sink
        .events
        .iter()
        .filter(|e| **e == AppEvent::ConfigChanged(ConfigSource::External))
        .count();
    assert_eq!(external, 1);
    assert_eq!(rig.house.last_command().unwrap().led_freq_hz, 2_000);
    assert!(rig.service.is_config_dirty());
}

#[test]
fn garbled_import_keeps_last_known_good() {
    let mut cfg = ClimateConfig::default();
    cfg.targets.temp_set = 29.0;
    let mut rig = Rig::new(cfg);

    let r = rig.command(AppCommand::ImportConfig("not json at all".into()));
    assert!(r.is_err());
    assert!((rig.service.config().targets.temp_set - 29.0).abs() < f32::EPSILON);
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::ConfigRejected(ConfigError::Garbled))
    );
}

#[test]
fn import_export_round_trip_through_commands() {
    let mut rig = Rig::new(ClimateConfig::default());
    rig.command(AppCommand::ApplyPreset(5)).unwrap();
    rig.command(AppCommand::ExportConfig).unwrap();
    let Some(AppEvent::ConfigExported(doc)) = rig.sink.events.last().cloned() else {
        panic!("no export event");
    };

    let mut other = Rig::new(ClimateConfig::default());
    other.command(AppCommand::ImportConfig(doc)).unwrap();
    assert_eq!(*other.service.config(), *rig.service.config());
    assert!((other.service.config().targets.temp_set - 32.0).abs() < f32::EPSILON);
}

#[test]
fn reset_defaults_restores_defaults() {
    let mut cfg = ClimateConfig::default();
    cfg.quiet.enabled = true;
    let mut rig = Rig::new(cfg);
    rig.command(AppCommand::ResetDefaults).unwrap();
    assert_eq!(*rig.service.config(), ClimateConfig::default());
}

// ── Persistence ───────────────────────────────────────────────

#[test]
fn auto_save_waits_for_the_debounce() {
    let store = MemoryConfigStore::new();
    let mut rig = Rig::new(ClimateConfig::default());
    rig.tick_with(27.0, 15.0);
    rig.command(AppCommand::ApplyPreset(12)).unwrap();

    let ticks = AUTO_SAVE_DELAY_MS / 1_000;
    for _ in 0..ticks {
        assert!(!rig.service.auto_save_if_needed(&store, &mut rig.sink));
        rig.tick_with(27.0, 15.0);
    }
    assert!(rig.service.auto_save_if_needed(&store, &mut rig.sink));
    assert!(!rig.service.is_config_dirty());
    assert_eq!(store.load(CONFIG_KEY).unwrap(), *rig.service.config());
}

#[test]
fn explicit_save_flushes_on_next_check() {
    let store = MemoryConfigStore::new();
    let mut rig = Rig::new(ClimateConfig::default());
    rig.tick_with(27.0, 15.0);
    rig.command(AppCommand::SaveConfig).unwrap();
    assert!(rig.service.auto_save_if_needed(&store, &mut rig.sink));
    assert!(store.contains(CONFIG_KEY));
}

#[test]
fn corrupted_store_falls_back_to_defaults() {
    let store = MemoryConfigStore::new();
    store.put_raw(CONFIG_KEY, vec![0xFF; 8]);
    assert_eq!(
        ClimateService::load_config(&store, CONFIG_KEY),
        ClimateConfig::default()
    );
}

// ── Stop / resume ─────────────────────────────────────────────

#[test]
fn resume_keeps_pending_timer() {
    let cfg = fast_alerts();
    let handle = ConfigHandle::new(cfg);
    let mut house = MockHouse::new();
    let clock = ManualClock::new();
    let mut notifier = RecordingNotifier::new();
    let mut sink = RecordingSink::new();

    let mut service = ClimateService::new(handle.clone());
    for _ in 0..6 {
        house.push(35.0, 15.0);
        service.tick(&mut house, &clock, &mut notifier, &mut sink);
        clock.advance(1_000);
    }
    assert_eq!(service.state().alerts.temp_high.stage, AlertStage::Pending);
    let state = service.into_state();

    // t = 6 s .. 10 s: Pending started at 0 and keeps counting.
    let mut service = ClimateService::resume(handle, state);
    for _ in 0..5 {
        house.push(35.0, 15.0);
        service.tick(&mut house, &clock, &mut notifier, &mut sink);
        clock.advance(1_000);
    }
    assert_eq!(service.state().alerts.temp_high.stage, AlertStage::Active);
    assert_eq!(notifier.sent.len(), 1);
    assert_eq!(notifier.sent[0].timestamp_ms, 10_000);
}

#[test]
fn reset_actuators_rearms_start_boost() {
    let mut cfg = ClimateConfig::default();
    cfg.sensor.smooth_window_temp = 1;
    let mut rig = Rig::new(cfg);
    rig.tick_with(35.0, 15.0);
    assert!(rig.service.state().ramp.fan.last_duty.is_some());

    rig.command(AppCommand::ResetActuators).unwrap();
    let idle = rig.house.last_command().unwrap();
    assert_eq!((idle.fan_duty, idle.led_duty), (0, 0));
    assert!(rig.service.state().ramp.fan.last_duty.is_none());
    assert!(rig.sink.events.contains(&AppEvent::ActuatorsReset));
}

#[test]
fn reset_actuators_keeps_active_low_outputs_off() {
    let mut cfg = ClimateConfig::default();
    cfg.control.invert_logic = true;
    let mut rig = Rig::new(cfg);
    rig.tick_with(35.0, 15.0);

    rig.command(AppCommand::ResetActuators).unwrap();
    let idle = rig.house.last_command().unwrap();
    assert_eq!((idle.fan_duty, idle.led_duty), (255, 255));

    // A gap right after the reset holds the idle level, not full drive.
    rig.house.push_gap();
    rig.tick();
    assert_eq!(rig.house.last_command(), Some(idle));
}

// ── Out-of-band delivery ──────────────────────────────────────

#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<Notification>>>);

impl NotificationSink for SharedSink {
    fn deliver(&mut self, notification: &Notification) -> Result<(), NotifyError> {
        self.0.lock().unwrap().push(*notification);
        Ok(())
    }
}

#[test]
fn dispatcher_delivers_what_ticks_enqueue() {
    let queue = NotificationQueue::new();
    let delivered = SharedSink::default();
    let dispatcher = Dispatcher::spawn(queue.clone(), delivered.clone(), RetryPolicy::default()).unwrap();

    let handle = ConfigHandle::new(fast_alerts());
    let mut service = ClimateService::new(handle);
    let mut house = MockHouse::new();
    let clock = ManualClock::new();
    let mut notifier = queue.clone();
    let mut sink = RecordingSink::new();
    for _ in 0..11 {
        house.push(35.0, 15.0);
        service.tick(&mut house, &clock, &mut notifier, &mut sink);
        clock.advance(1_000);
    }

    let stats = dispatcher.stop();
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(delivered.0.lock().unwrap().len(), 1);
    assert!(queue.is_empty());
}
