//! Alert engine: one hysteretic multi-timer machine per monitored boundary.
//!
//! Each machine is a function-pointer stage table:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Stage table                                 │
//! │  ┌────────────┬───────────┬───────────────┐  │
//! │  │ AlertStage │ on_enter  │ on_update     │  │
//! │  ├────────────┼───────────┼───────────────┤  │
//! │  │ Normal     │ fn(ctx)   │ fn(ctx)->Opt  │  │
//! │  │ Pending    │ -         │ fn(ctx)->Opt  │  │
//! │  │ Active     │ fn(ctx)   │ fn(ctx)->Opt  │  │
//! │  │ Recovering │ -         │ fn(ctx)->Opt  │  │
//! │  └────────────┴───────────┴───────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! A step calls `on_update` for the current stage; a returned stage is
//! entered (its `on_enter` runs, `entered_at` is stamped) and the new
//! stage is updated in turn, so zero-length timers settle within one
//! step.  The four machines (temp high/low, lux high/low) are
//! independent and share timer semantics.  All timers use the monotonic
//! clock.

pub mod context;
pub mod stages;

use heapless::Vec;
use log::info;
use serde::Serialize;

use crate::config::AlertConfig;
use crate::notify::Notification;
use crate::sensors::SmoothedSample;
use context::{AlertContext, AlertInput, AlertTimers};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[repr(u8)]
pub enum AlertStage {
    #[default]
    Normal = 0,
    Pending = 1,
    Active = 2,
    Recovering = 3,
}

impl AlertStage {
    pub const COUNT: usize = 4;

    pub fn as_str(self) -> &'static str {
        STAGE_TABLE[self as usize].name
    }

    /// Ranking used to pick the most urgent stage of a channel.
    pub fn severity(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Pending => 1,
            Self::Recovering => 2,
            Self::Active => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum AlertCause {
    #[default]
    None,
    TempHigh,
    TempLow,
    LuxHigh,
    LuxLow,
}

impl AlertCause {
    pub const MONITORED: [Self; 4] = [Self::TempHigh, Self::TempLow, Self::LuxHigh, Self::LuxLow];

    /// High bounds breach strictly above, low bounds strictly below.
    pub fn is_breach(self, value: f32, threshold: f32) -> bool {
        match self {
            Self::TempHigh | Self::LuxHigh => value > threshold,
            Self::TempLow | Self::LuxLow => value < threshold,
            Self::None => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::TempHigh => "temp-high",
            Self::TempLow => "temp-low",
            Self::LuxHigh => "lux-high",
            Self::LuxLow => "lux-low",
        }
    }
}

/// Carried state of one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AlertState {
    pub stage: AlertStage,
    pub cause: AlertCause,
    pub entered_at_ms: u64,
    pub last_notified_at_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Stage table
// ---------------------------------------------------------------------------

pub type StageEnterFn = fn(&mut AlertContext);
pub type StageUpdateFn = fn(&mut AlertContext) -> Option<AlertStage>;

/// One row of the stage table.
pub struct StageDescriptor {
    pub stage: AlertStage,
    pub name: &'static str,
    pub on_enter: Option<StageEnterFn>,
    pub on_update: StageUpdateFn,
}

static STAGE_TABLE: [StageDescriptor; AlertStage::COUNT] = stages::build_stage_table();

/// Advance one machine by one step.  Pure: the next state and the optional
/// notification are returned, `state` is not touched.
pub fn step(
    state: &AlertState,
    cause: AlertCause,
    input: AlertInput,
    timers: AlertTimers,
) -> (AlertState, Option<Notification>) {
    let mut ctx = AlertContext::new(state, cause, input, timers);

    // Each transition needs a different breach polarity than the one
    // before, so a step settles in at most COUNT transitions.
    for _ in 0..AlertStage::COUNT {
        let Some(next) = (STAGE_TABLE[ctx.stage as usize].on_update)(&mut ctx) else {
            break;
        };
        info!(
            "ALERT {}: {} -> {} (value {:.2}, threshold {:.2})",
            cause.as_str(),
            ctx.stage.as_str(),
            next.as_str(),
            input.value,
            input.threshold
        );
        ctx.previous = ctx.stage;
        ctx.stage = next;
        ctx.entered_at_ms = input.now_ms;
        if let Some(enter) = STAGE_TABLE[next as usize].on_enter {
            enter(&mut ctx);
        }
    }
    ctx.into_state()
}

// ---------------------------------------------------------------------------
// The four machines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AlertBank {
    pub temp_high: AlertState,
    pub temp_low: AlertState,
    pub lux_high: AlertState,
    pub lux_low: AlertState,
}

impl AlertBank {
    pub fn get(&self, cause: AlertCause) -> Option<&AlertState> {
        match cause {
            AlertCause::TempHigh => Some(&self.temp_high),
            AlertCause::TempLow => Some(&self.temp_low),
            AlertCause::LuxHigh => Some(&self.lux_high),
            AlertCause::LuxLow => Some(&self.lux_low),
            AlertCause::None => None,
        }
    }

    fn slot(&mut self, cause: AlertCause) -> Option<&mut AlertState> {
        match cause {
            AlertCause::TempHigh => Some(&mut self.temp_high),
            AlertCause::TempLow => Some(&mut self.temp_low),
            AlertCause::LuxHigh => Some(&mut self.lux_high),
            AlertCause::LuxLow => Some(&mut self.lux_low),
            AlertCause::None => None,
        }
    }

    /// Step every machine against one smoothed sample.  With alerts
    /// disabled every machine is forced back to Normal and nothing is sent.
    pub fn step(
        &self,
        sample: &SmoothedSample,
        cfg: &AlertConfig,
        now_ms: u64,
    ) -> (Self, Vec<Notification, 4>) {
        let mut notifications = Vec::new();
        if !cfg.enabled {
            return (Self::default(), notifications);
        }
        let timers = AlertTimers::from_config(cfg);
        let mut next = *self;
        for cause in AlertCause::MONITORED {
            let (value, threshold) = match cause {
                AlertCause::TempHigh => (sample.temperature, cfg.temp_high),
                AlertCause::TempLow => (sample.temperature, cfg.temp_low),
                AlertCause::LuxHigh => (sample.lux, cfg.lux_high),
                AlertCause::LuxLow | AlertCause::None => (sample.lux, cfg.lux_low),
            };
            let Some(slot) = next.slot(cause) else { continue };
            let input = AlertInput {
                now_ms,
                value,
                threshold,
            };
            let (state, note) = step(slot, cause, input, timers);
            *slot = state;
            if let Some(n) = note {
                // Capacity equals the number of machines.
                let _ = notifications.push(n);
            }
        }
        (next, notifications)
    }

    /// Most urgent stage of the temperature machines.
    pub fn temperature_stage(&self) -> AlertStage {
        worst(self.temp_high.stage, self.temp_low.stage)
    }

    /// Most urgent stage of the lux machines.
    pub fn lux_stage(&self) -> AlertStage {
        worst(self.lux_high.stage, self.lux_low.stage)
    }
}

fn worst(a: AlertStage, b: AlertStage) -> AlertStage {
    if b.severity() > a.severity() { b } else { a }
}
