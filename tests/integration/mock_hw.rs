//! Mock adapters for integration tests.
//!
//! Records every actuator call, event and notification so tests can
//! assert on the full history without real sensors or PWM hardware.

use std::cell::Cell;
use std::collections::VecDeque;

use broiler_climate::app::cycle::DutyCommand;
use broiler_climate::app::events::AppEvent;
use broiler_climate::app::ports::{ActuatorPort, ClockPort, EventSink, NotificationPort, SensorPort};
use broiler_climate::error::NotifyError;
use broiler_climate::notify::Notification;
use broiler_climate::sensors::RawSample;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    Apply(DutyCommand),
}

// ── MockHouse ─────────────────────────────────────────────────

/// Sensor + actuators.  Each `read_sample` pops one queued reading;
/// `None` entries model ticks without a new sample.
pub struct MockHouse {
    pub readings: VecDeque<Option<(f32, f32)>>,
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockHouse {
    pub fn new() -> Self {
        Self {
            readings: VecDeque::new(),
            calls: Vec::new(),
        }
    }

    pub fn push(&mut self, temperature: f32, lux: f32) {
        self.readings.push_back(Some((temperature, lux)));
    }

    pub fn push_gap(&mut self) {
        self.readings.push_back(None);
    }

    pub fn last_command(&self) -> Option<DutyCommand> {
        self.calls.last().map(|ActuatorCall::Apply(cmd)| *cmd)
    }
}

impl Default for MockHouse {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHouse {
    fn read_sample(&mut self) -> Option<RawSample> {
        let (temperature, lux) = self.readings.pop_front().flatten()?;
        Some(RawSample {
            timestamp_ms: 0,
            temperature,
            lux,
        })
    }
}

impl ActuatorPort for MockHouse {
    fn apply(&mut self, command: &DutyCommand) {
        self.calls.push(ActuatorCall::Apply(*command));
    }
}

// ── ManualClock ───────────────────────────────────────────────

pub struct ManualClock {
    pub now_ms: Cell<u64>,
    pub minute_of_day: Cell<Option<u16>>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            now_ms: Cell::new(0),
            minute_of_day: Cell::new(None),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }

    pub fn set_time_of_day(&self, hour: u16, minute: u16) {
        self.minute_of_day.set(Some(hour * 60 + minute));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for ManualClock {
    fn monotonic_ms(&self) -> u64 {
        self.now_ms.get()
    }

    fn minute_of_day(&self) -> Option<u16> {
        self.minute_of_day.get()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn telemetry_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::Telemetry(_)))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── RecordingNotifier ─────────────────────────────────────────

/// Collects notification intents; `refuse` models a full queue.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Vec<Notification>,
    pub refuse: bool,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationPort for RecordingNotifier {
    fn enqueue(&mut self, notification: Notification) -> Result<(), NotifyError> {
        if self.refuse {
            return Err(NotifyError::QueueFull);
        }
        self.sent.push(notification);
        Ok(())
    }
}
