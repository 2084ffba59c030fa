//! Per-step context threaded through every stage handler.
//!
//! The handlers read the current reading and timers from here and write
//! the carried fields (`entered_at_ms`, `last_notified_at_ms`) plus at most
//! one outgoing notification.

use crate::config::AlertConfig;
use crate::notify::{Notification, NotificationKind};

use super::{AlertCause, AlertStage, AlertState};

/// Alert timers in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertTimers {
    pub hold_ms: u64,
    pub recovery_ms: u64,
    pub grace_ms: u64,
    /// `None` disables reminders.
    pub renotify_ms: Option<u64>,
}

impl AlertTimers {
    pub fn from_config(cfg: &AlertConfig) -> Self {
        let ms = |secs: f32| (secs.max(0.0) * 1000.0).round() as u64;
        let renotify = ms(cfg.re_notify_min * 60.0);
        Self {
            hold_ms: ms(cfg.hold_sec),
            recovery_ms: ms(cfg.recovery_sec),
            grace_ms: ms(cfg.grace_normal_sec),
            renotify_ms: (renotify > 0).then_some(renotify),
        }
    }

    /// Settle time in Recovering: both recovery and grace must elapse.
    pub fn settle_ms(&self) -> u64 {
        self.recovery_ms.max(self.grace_ms)
    }
}

/// The reading handed to one machine for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertInput {
    /// Monotonic clock.
    pub now_ms: u64,
    pub value: f32,
    pub threshold: f32,
}

pub struct AlertContext {
    pub cause: AlertCause,
    pub input: AlertInput,
    pub timers: AlertTimers,
    /// Whether the value is beyond the threshold this step.
    pub breached: bool,

    pub stage: AlertStage,
    /// Stage we came from on the last transition.
    pub previous: AlertStage,
    pub entered_at_ms: u64,
    pub last_notified_at_ms: Option<u64>,

    pub notification: Option<Notification>,
}

impl AlertContext {
    pub fn new(state: &AlertState, cause: AlertCause, input: AlertInput, timers: AlertTimers) -> Self {
        Self {
            cause,
            input,
            timers,
            breached: cause.is_breach(input.value, input.threshold),
            stage: state.stage,
            previous: state.stage,
            entered_at_ms: state.entered_at_ms,
            last_notified_at_ms: state.last_notified_at_ms,
            notification: None,
        }
    }

    pub fn in_stage_ms(&self) -> u64 {
        self.input.now_ms.saturating_sub(self.entered_at_ms)
    }

    /// Whether a reminder period has passed since the last notification.
    /// Always true when nothing was sent yet.
    pub fn renotify_due(&self) -> bool {
        match (self.timers.renotify_ms, self.last_notified_at_ms) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(period), Some(last)) => self.input.now_ms.saturating_sub(last) >= period,
        }
    }

    /// Queue a notification for `kind` and stamp the notify time.
    pub fn notify(&mut self, kind: NotificationKind) {
        self.last_notified_at_ms = Some(self.input.now_ms);
        self.notification = Some(Notification {
            cause: self.cause,
            stage: self.stage,
            kind,
            value: self.input.value,
            threshold: self.input.threshold,
            timestamp_ms: self.input.now_ms,
        });
    }

    pub fn into_state(self) -> (AlertState, Option<Notification>) {
        let cause = if self.stage == AlertStage::Normal {
            AlertCause::None
        } else {
            self.cause
        };
        (
            AlertState {
                stage: self.stage,
                cause,
                entered_at_ms: self.entered_at_ms,
                last_notified_at_ms: self.last_notified_at_ms,
            },
            self.notification,
        )
    }
}
