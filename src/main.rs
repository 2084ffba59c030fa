//! Broiler climate engine: host entry point.
//!
//! Runs the control loop against a simulated house and simulated PWM
//! channels.  Alerts go to the log, or to a webhook when the `webhook`
//! feature is enabled and a URL is configured.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  HardwareAdapter      LogEventSink   MemoryConfigStore       │
//! │  (SimulatedSensor +   (EventSink)    (ConfigPort)            │
//! │   SimPwmChannel x2)   SystemClock    Log/WebhookSink         │
//! │                       (ClockPort)    (NotificationSink)      │
//! │  ───────────────── Port Trait Boundary ───────────────────   │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │          ClimateService (pure control cycle)           │  │
//! │  │  smoother · duty mapper · overlays · alert stages      │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │  ControlLoop (paced ticks)   Dispatcher (retry/backoff)      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use serde_json::json;

use broiler_climate::adapters::hardware::HardwareAdapter;
use broiler_climate::adapters::log_sink::LogEventSink;
use broiler_climate::adapters::memory_store::MemoryConfigStore;
use broiler_climate::adapters::notify_sink::LogNotificationSink;
use broiler_climate::adapters::pwm::SimPwmChannel;
use broiler_climate::adapters::sim_sensor::SimulatedSensor;
use broiler_climate::adapters::time::SystemClock;
use broiler_climate::app::commands::AppCommand;
use broiler_climate::app::service::{CONFIG_KEY, ClimateService};
use broiler_climate::config::ConfigHandle;
use broiler_climate::notify::NotificationQueue;
use broiler_climate::notify::dispatcher::{Dispatcher, RetryPolicy};
use broiler_climate::runner::ControlLoop;

/// LEDC-style resolutions of the simulated channels.
const FAN_PWM_MAX: u16 = 255;
const LED_PWM_MAX: u16 = 1023;

#[derive(Debug, Parser)]
#[command(name = "broiler-climate", version, about = "Broiler-house climate control loop (simulated house)")]
struct Args {
    /// Control ticks to run (0 runs until killed).
    #[arg(short, long, default_value_t = 60)]
    ticks: u64,

    /// Settings document (JSON) imported before the first tick.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Apply the age preset for this flock age in days.
    #[arg(short, long, value_name = "DAYS")]
    age: Option<u32>,

    /// Enable night mode, keeping the configured window and caps.
    #[arg(long)]
    night: bool,

    /// Enable quiet mode.
    #[arg(long)]
    quiet: bool,

    /// Seed of the simulated sensor noise.
    #[arg(long, default_value_t = 42)]
    seed: u32,

    /// Drop every n-th sensor sample (0 keeps all).
    #[arg(long, default_value_t = 0)]
    dropout: u32,

    /// Shift the simulated temperature curve in °C.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    temp_bias: f32,

    /// Webhook endpoint for alert notifications.
    #[arg(long, value_name = "URL")]
    webhook: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    info!("╔══════════════════════════════════════╗");
    info!("║  broiler-climate v{:<19}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 1. Configuration ──────────────────────────────────────
    let store = MemoryConfigStore::new();
    let config = ConfigHandle::new(ClimateService::load_config(&store, CONFIG_KEY));
    let service = ClimateService::new(config.clone());

    // ── 2. Adapters ───────────────────────────────────────────
    let step_ms = config.snapshot().interval_ms();
    let mut sensor = SimulatedSensor::new(step_ms, args.seed).with_dropout(args.dropout);
    sensor.set_temp_bias(args.temp_bias);
    let hw = HardwareAdapter::new(
        sensor,
        SimPwmChannel::new(FAN_PWM_MAX),
        SimPwmChannel::new(LED_PWM_MAX),
    );

    let queue = NotificationQueue::new();
    let mut control = ControlLoop::new(
        service,
        hw,
        SystemClock::new(),
        &store,
        LogEventSink::new(),
        queue.clone(),
    );

    // ── 3. Operator commands, applied before the first tick ───
    let handle = control.handle();
    if let Some(path) = &args.config {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings document {}", path.display()))?;
        queue_command(&handle, AppCommand::ImportConfig(text));
    }
    if let Some(age) = args.age {
        queue_command(&handle, AppCommand::ApplyPreset(age));
    }
    if let Some(patch) = startup_patch(&args) {
        queue_command(&handle, AppCommand::UpdateConfig(patch));
    }

    // ── 4. Notification dispatcher ────────────────────────────
    let dispatcher = spawn_dispatcher(queue, &config, args.webhook.is_some())?;

    // ── 5. Control loop ───────────────────────────────────────
    let max_ticks = (args.ticks > 0).then_some(args.ticks);
    control.run(max_ticks);

    let (state, hw) = control.finish();
    let stats = dispatcher.stop();
    info!(
        "Final: fan={} led={} temp_alert={} lux_alert={} | notifications delivered={} failed={}",
        hw.fan().duty(),
        hw.led().duty(),
        state.alerts.temperature_stage().as_str(),
        state.alerts.lux_stage().as_str(),
        stats.delivered,
        stats.failed
    );
    Ok(())
}

/// Flag overrides as a partial patch, so imported settings the flags do
/// not name survive.
fn startup_patch(args: &Args) -> Option<serde_json::Value> {
    let mut patch = serde_json::Map::new();
    if args.night {
        patch.insert("night".into(), json!({ "enabled": true }));
    }
    if args.quiet {
        patch.insert("quiet".into(), json!({ "enabled": true }));
    }
    if let Some(url) = &args.webhook {
        patch.insert("alerts".into(), json!({ "webhookUrl": url }));
    }
    (!patch.is_empty()).then(|| patch.into())
}

fn queue_command(handle: &broiler_climate::runner::ControlHandle, cmd: AppCommand) {
    if handle.send(cmd).is_err() {
        warn!("Startup command dropped, inbox full");
    }
}

#[cfg(feature = "webhook")]
fn spawn_dispatcher(queue: NotificationQueue, config: &ConfigHandle, webhook: bool) -> Result<Dispatcher> {
    use broiler_climate::adapters::webhook::WebhookSink;

    if webhook || !config.snapshot().alerts.webhook_url.is_empty() {
        return Dispatcher::spawn(queue, WebhookSink::new(config.clone())?, RetryPolicy::default());
    }
    Dispatcher::spawn(queue, LogNotificationSink::new(), RetryPolicy::default())
}

#[cfg(not(feature = "webhook"))]
fn spawn_dispatcher(queue: NotificationQueue, _config: &ConfigHandle, webhook: bool) -> Result<Dispatcher> {
    if webhook {
        warn!("Built without the `webhook` feature, alerts go to the log only");
    }
    Dispatcher::spawn(queue, LogNotificationSink::new(), RetryPolicy::default())
}
