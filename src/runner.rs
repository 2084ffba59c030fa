//! Periodic control loop.
//!
//! Drives [`ClimateService::tick`] on a fixed cadence taken from the live
//! configuration.  Ticks never overlap: a tick that overruns its slot
//! pushes the next deadline out instead of queueing a burst.  Operator
//! commands arrive through a bounded channel and are applied between
//! ticks, so a tick always sees one configuration snapshot.
//!
//! ```text
//!   ControlHandle ──(AppCommand)──▶ ┌─────────────┐ ──▶ NotificationQueue
//!   ControlHandle ──(stop)────────▶ │ ControlLoop │ ──▶ ConfigPort (auto-save)
//!                                   └─────────────┘
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::{debug, info, warn};

use crate::app::commands::AppCommand;
use crate::app::cycle::{DutyCommand, EngineState};
use crate::app::ports::{ActuatorPort, ClockPort, ConfigPort, EventSink, SensorPort};
use crate::app::service::ClimateService;
use crate::config::ConfigHandle;
use crate::notify::NotificationQueue;

/// Pending operator commands before senders are refused.
pub const COMMAND_DEPTH: usize = 8;

/// Longest single sleep while waiting for the next deadline.
const STOP_POLL: Duration = Duration::from_millis(100);

type CommandChannel = Channel<CriticalSectionRawMutex, AppCommand, COMMAND_DEPTH>;

/// Cloneable remote control for a running [`ControlLoop`].
#[derive(Clone)]
pub struct ControlHandle {
    commands: Arc<CommandChannel>,
    stop: Arc<AtomicBool>,
    config: ConfigHandle,
}

impl ControlHandle {
    /// Queue a command for the next gap between ticks.  Hands the command
    /// back if the inbox is full.
    pub fn send(&self, cmd: AppCommand) -> Result<(), AppCommand> {
        self.commands.try_send(cmd).map_err(|TrySendError::Full(cmd)| {
            warn!("Command inbox full, command refused");
            cmd
        })
    }

    /// Ask the loop to stop after the current tick.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Shared configuration; writers swap whole snapshots.
    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }
}

pub struct ControlLoop<H, C, P, E> {
    service: ClimateService,
    hw: H,
    clock: C,
    store: P,
    sink: E,
    notifier: NotificationQueue,
    handle: ControlHandle,
}

impl<H, C, P, E> ControlLoop<H, C, P, E>
where
    H: SensorPort + ActuatorPort,
    C: ClockPort,
    P: ConfigPort,
    E: EventSink,
{
    pub fn new(
        service: ClimateService,
        hw: H,
        clock: C,
        store: P,
        sink: E,
        notifier: NotificationQueue,
    ) -> Self {
        let handle = ControlHandle {
            commands: Arc::new(Channel::new()),
            stop: Arc::new(AtomicBool::new(false)),
            config: service.config_handle().clone(),
        };
        Self {
            service,
            hw,
            clock,
            store,
            sink,
            notifier,
            handle,
        }
    }

    pub fn handle(&self) -> ControlHandle {
        self.handle.clone()
    }

    pub fn service(&self) -> &ClimateService {
        &self.service
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    /// One iteration without pacing: pending commands, one tick, auto-save.
    pub fn step(&mut self) -> DutyCommand {
        self.drain_commands();
        let command = self
            .service
            .tick(&mut self.hw, &self.clock, &mut self.notifier, &mut self.sink);
        self.service.auto_save_if_needed(&self.store, &mut self.sink);
        command
    }

    /// Run until stopped or `max_ticks` ticks have executed.  Returns the
    /// number of ticks run by this call.
    pub fn run(&mut self, max_ticks: Option<u64>) -> u64 {
        self.service.start(&mut self.sink);
        let mut ticks = 0u64;
        let mut deadline = Instant::now();

        while !self.handle.is_stopped() && max_ticks.is_none_or(|max| ticks < max) {
            self.wait_until(deadline);
            if self.handle.is_stopped() {
                break;
            }

            self.step();
            ticks += 1;

            let interval = Duration::from_millis(self.service.config().interval_ms());
            deadline += interval;
            let now = Instant::now();
            if now > deadline {
                warn!(
                    "Tick {} overran its slot by {} ms, rescheduling",
                    self.service.tick_count(),
                    (now - deadline).as_millis()
                );
                deadline = now;
            }
        }

        info!("Control loop stopped after {ticks} ticks");
        ticks
    }

    /// Flush unsaved configuration and hand back the carried state so a
    /// later loop can [`ClimateService::resume`] without re-boosting or
    /// restarting alert timers.
    pub fn finish(mut self) -> (EngineState, H) {
        self.drain_commands();
        self.service.force_save_if_dirty(&self.store, &mut self.sink);
        (self.service.into_state(), self.hw)
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.handle.commands.try_receive() {
            debug!("Applying queued command {cmd:?}");
            // Rejections are already reported through the event sink.
            let _ = self.service.handle_command(cmd, &mut self.hw, &mut self.sink);
        }
    }

    fn wait_until(&self, deadline: Instant) {
        loop {
            let now = Instant::now();
            if now >= deadline || self.handle.is_stopped() {
                return;
            }
            thread::sleep((deadline - now).min(STOP_POLL));
        }
    }
}
