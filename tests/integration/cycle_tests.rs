//! Scenario tests for the pure control cycle: duty sequences, alert
//! lifecycles, overlays and the no-sample path.

use broiler_climate::alert::AlertStage;
use broiler_climate::app::cycle::{CycleInput, CycleOutput, EngineState, run_cycle};
use broiler_climate::config::{ClimateConfig, ControlMode};
use broiler_climate::control::preset;
use broiler_climate::notify::{Notification, NotificationKind};
use broiler_climate::sensors::RawSample;

const SEC: u64 = 1_000;
const MIN: u64 = 60 * SEC;

/// Unsmoothed readings, no boost, no ramp: logical duty is the raw
/// strategy output.
fn direct_config() -> ClimateConfig {
    let mut cfg = ClimateConfig::default();
    cfg.sensor.smooth_window_temp = 1;
    cfg.sensor.smooth_window_lux = 1;
    cfg.control.fan_start_boost_ms = 0.0;
    cfg.control.fan_ramp_per_sec = 0.0;
    cfg
}

fn sample(temperature: f32, lux: f32) -> Option<RawSample> {
    Some(RawSample {
        timestamp_ms: 0,
        temperature,
        lux,
    })
}

struct Run {
    cfg: ClimateConfig,
    state: EngineState,
    now_ms: u64,
    notifications: Vec<Notification>,
}

impl Run {
    fn new(cfg: ClimateConfig) -> Self {
        Self {
            cfg,
            state: EngineState::default(),
            now_ms: 0,
            notifications: Vec::new(),
        }
    }

    fn tick(&mut self, sample: Option<RawSample>, minute_of_day: Option<u16>) -> CycleOutput {
        let out = run_cycle(
            &CycleInput {
                now_ms: self.now_ms,
                minute_of_day,
                sample,
            },
            &self.cfg,
            &self.state,
        );
        self.state = out.state.clone();
        self.notifications.extend(out.notifications.iter().copied());
        out
    }

    fn temp(&mut self, t: f32, step_ms: u64) -> CycleOutput {
        let out = self.tick(sample(t, 15.0), None);
        self.now_ms += step_ms;
        out
    }
}

fn dedup(stages: &[AlertStage]) -> Vec<AlertStage> {
    let mut v = stages.to_vec();
    v.dedup();
    v
}

// ── Bang-bang boundary ────────────────────────────────────────

#[test]
fn bangbang_switches_at_setpoint_plus_hysteresis() {
    let mut cfg = direct_config();
    cfg.targets.temp_set = 27.0;
    cfg.targets.hys = 0.7;
    cfg.strategy.temp_mode = ControlMode::Bangbang;
    let (lo, hi) = (50, 255);
    let mut run = Run::new(cfg);

    let duties: Vec<u8> = [27.0, 27.6, 27.8, 27.5, 26.9]
        .iter()
        .map(|&t| run.temp(t, SEC).report.unwrap().fan_logical)
        .collect();
    assert_eq!(duties, vec![lo, lo, hi, hi, lo]);
}

#[test]
fn bangbang_exact_upper_boundary_does_not_engage() {
    let mut cfg = direct_config();
    cfg.targets.temp_set = 27.0;
    cfg.targets.hys = 0.5;
    let mut run = Run::new(cfg);
    assert_eq!(run.temp(27.5, SEC).report.unwrap().fan_logical, 50);
    assert_eq!(run.temp(27.51, SEC).report.unwrap().fan_logical, 255);
}

// ── Proportional + ramp + boost ───────────────────────────────

#[test]
fn proportional_fan_ramps_after_boost() {
    let mut cfg = ClimateConfig::default();
    cfg.sensor.smooth_window_temp = 1;
    cfg.strategy.temp_mode = ControlMode::Proportional;
    cfg.strategy.kp_temp = 20.0;
    cfg.control.fan_ramp_per_sec = 10.0;
    cfg.control.fan_start_boost_ms = 1_500.0;
    let mut run = Run::new(cfg);

    // Target 50 + 20*5 = 150.  Boost holds max(255, target) for 1.5 s.
    let first = run.temp(32.0, SEC).report.unwrap().fan_logical;
    let second = run.temp(32.0, SEC).report.unwrap().fan_logical;
    assert_eq!((first, second), (255, 255));

    // Boost over: ramp down toward 150 at 10 per second.
    let third = run.temp(32.0, SEC).report.unwrap().fan_logical;
    let fourth = run.temp(32.0, SEC).report.unwrap().fan_logical;
    assert_eq!(third, 245);
    assert_eq!(fourth, 235);
}

// ── Alert lifecycle ───────────────────────────────────────────

#[test]
fn sustained_breach_then_recovery_notifies_once() {
    let mut cfg = direct_config();
    cfg.alerts.temp_high = 33.0;
    cfg.alerts.hold_sec = 10.0;
    cfg.alerts.recovery_sec = 6.0;
    cfg.alerts.grace_normal_sec = 3.0;
    let mut run = Run::new(cfg);

    let mut stages = vec![AlertStage::Normal];
    for _ in 0..11 {
        stages.push(run.temp(34.0, SEC).report.unwrap().temp_alert);
    }
    for _ in 0..10 {
        stages.push(run.temp(27.0, SEC).report.unwrap().temp_alert);
    }

    assert_eq!(
        dedup(&stages),
        vec![
            AlertStage::Normal,
            AlertStage::Pending,
            AlertStage::Active,
            AlertStage::Recovering,
            AlertStage::Normal
        ]
    );
    assert_eq!(run.notifications.len(), 1);
    let n = run.notifications[0];
    assert_eq!(n.kind, NotificationKind::Raised);
    assert_eq!(n.stage, AlertStage::Active);
    assert_eq!(n.timestamp_ms, 10 * SEC);
    assert!((n.threshold - 33.0).abs() < f32::EPSILON);
}

#[test]
fn transient_breach_is_ignored() {
    let mut cfg = direct_config();
    cfg.alerts.hold_sec = 10.0;
    let mut run = Run::new(cfg);
    for _ in 0..5 {
        run.temp(34.0, SEC);
    }
    assert_eq!(run.temp(27.0, SEC).report.unwrap().temp_alert, AlertStage::Normal);
    assert!(run.notifications.is_empty());
}

#[test]
fn reminders_every_renotify_period() {
    let mut cfg = direct_config();
    cfg.alerts.hold_sec = 0.0;
    cfg.alerts.re_notify_min = 30.0;
    let mut run = Run::new(cfg);

    // One tick per minute, held Active for 65 minutes.
    for _ in 0..=65 {
        run.temp(34.0, MIN);
    }
    let at: Vec<u64> = run.notifications.iter().map(|n| n.timestamp_ms / MIN).collect();
    assert_eq!(at, vec![0, 30, 60]);
    let kinds: Vec<NotificationKind> = run.notifications.iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NotificationKind::Raised,
            NotificationKind::Reminder,
            NotificationKind::Reminder
        ]
    );
}

#[test]
fn quick_realert_from_recovering_is_suppressed() {
    let mut cfg = direct_config();
    cfg.alerts.hold_sec = 0.0;
    cfg.alerts.recovery_sec = 120.0;
    cfg.alerts.re_notify_min = 30.0;
    let mut run = Run::new(cfg);

    run.temp(34.0, SEC);
    assert_eq!(run.temp(27.0, SEC).report.unwrap().temp_alert, AlertStage::Recovering);
    assert_eq!(run.temp(34.0, SEC).report.unwrap().temp_alert, AlertStage::Active);
    assert_eq!(run.notifications.len(), 1);
}

#[test]
fn temperature_and_lux_alert_independently() {
    let mut cfg = direct_config();
    cfg.alerts.hold_sec = 0.0;
    let mut run = Run::new(cfg);
    let out = run.tick(sample(18.0, 40.0), None);
    let report = out.report.unwrap();
    assert_eq!(report.temp_alert, AlertStage::Active);
    assert_eq!(report.lux_alert, AlertStage::Active);
    let mut causes: Vec<&str> = out.notifications.iter().map(|n| n.cause.as_str()).collect();
    causes.sort_unstable();
    assert_eq!(causes.len(), 2);
}

#[test]
fn disabled_alerts_stay_normal() {
    let mut cfg = direct_config();
    cfg.alerts.enabled = false;
    cfg.alerts.hold_sec = 0.0;
    let mut run = Run::new(cfg);
    for _ in 0..5 {
        assert_eq!(run.temp(40.0, SEC).report.unwrap().temp_alert, AlertStage::Normal);
    }
    assert!(run.notifications.is_empty());
}

// ── Missing samples ───────────────────────────────────────────

#[test]
fn gap_holds_previous_command_and_alert_state() {
    let mut cfg = direct_config();
    cfg.alerts.hold_sec = 10.0;
    let mut run = Run::new(cfg);

    let with_sample = run.temp(34.0, SEC);
    let pending = with_sample.state.alerts.temp_high;
    run.now_ms += 60 * SEC;
    let gap = run.tick(None, None);

    assert!(gap.report.is_none());
    assert_eq!(gap.command, with_sample.command);
    assert_eq!(gap.state.alerts.temp_high, pending);
    assert!(gap.notifications.is_empty());
}

#[test]
fn no_sample_ever_means_idle_outputs() {
    let mut cfg = ClimateConfig::default();
    cfg.control.invert_logic = true;
    let mut run = Run::new(cfg);
    let out = run.tick(None, None);
    assert_eq!((out.command.fan_duty, out.command.led_duty), (255, 255));
}

// ── Overlays ──────────────────────────────────────────────────

#[test]
fn night_and_quiet_caps_take_the_stricter() {
    let mut cfg = direct_config();
    cfg.night.enabled = true;
    cfg.night.start = "21:00".into();
    cfg.night.end = "05:00".into();
    cfg.night.fan_max = 160.0;
    cfg.quiet.enabled = true;
    cfg.quiet.fan_max = 120.0;
    let mut run = Run::new(cfg);

    let out = run.tick(sample(35.0, 15.0), Some(23 * 60));
    let report = out.report.unwrap();
    assert!(report.modes.night && report.modes.quiet);
    assert_eq!(report.fan_logical, 120);
}

#[test]
fn night_window_retargets_led() {
    let mut cfg = direct_config();
    cfg.night.enabled = true;
    cfg.night.lux_target = 8.0;
    cfg.targets.lux_set = 15.0;
    let mut run = Run::new(cfg);

    // 10 lx: below the day target, above the night target.
    let day = run.tick(sample(27.0, 10.0), Some(12 * 60)).report.unwrap();
    let night = run.tick(sample(27.0, 10.0), Some(22 * 60)).report.unwrap();
    assert!(day.led_logical > night.led_logical);
    assert!(!day.modes.night && night.modes.night);
}

#[test]
fn unknown_wall_clock_keeps_night_off() {
    let mut cfg = direct_config();
    cfg.night.enabled = true;
    cfg.night.fan_max = 100.0;
    let mut run = Run::new(cfg);
    let report = run.tick(sample(35.0, 15.0), None).report.unwrap();
    assert!(!report.modes.night);
    assert_eq!(report.fan_logical, 255);
}

// ── Presets ───────────────────────────────────────────────────

#[test]
fn preset_table_matches_age_bands() {
    let p = preset::resolve(10);
    assert_eq!((p.temp, p.lux, p.hys), (30.0, 18.0, 1.0));
    let p = preset::resolve(0);
    assert_eq!((p.temp, p.lux, p.hys), (34.0, 22.0, 1.5));
    let p = preset::resolve(30);
    assert_eq!((p.temp, p.lux, p.hys), (24.0, 12.0, 0.7));
}
