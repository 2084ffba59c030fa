//! Notification intents and the bounded queue between the control tick
//! and the out-of-band dispatcher.
//!
//! ```text
//! ┌──────────────┐  try_send   ┌───────────────────┐  deliver  ┌──────┐
//! │ control tick │────────────▶│ NotificationQueue │──────────▶│ sink │
//! │   (sync)     │ never waits │  (embassy chan)   │  retry +  │      │
//! └──────────────┘             └───────────────────┘  backoff  └──────┘
//! ```
//!
//! The tick side only ever calls `try_send`; a full queue drops the intent
//! with a warning instead of blocking the loop.

pub mod dispatcher;

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;
use serde::Serialize;

use crate::alert::{AlertCause, AlertStage};
use crate::app::ports::NotificationPort;
use crate::error::NotifyError;

/// Queue depth.  Four machines raise at most four intents per tick.
pub const NOTIFY_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Pending → Active.
    Raised,
    /// Still Active after the reminder period.
    Reminder,
    /// Recovering → Active.
    Reraised,
}

/// One operator-facing alert event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub cause: AlertCause,
    pub stage: AlertStage,
    pub kind: NotificationKind,
    pub value: f32,
    pub threshold: f32,
    /// Monotonic milliseconds.
    pub timestamp_ms: u64,
}

impl Notification {
    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "{} {:?}: value {:.2} vs threshold {:.2}",
            self.cause.as_str(),
            self.kind,
            self.value,
            self.threshold
        )
    }
}

type RawQueue = Channel<CriticalSectionRawMutex, Notification, NOTIFY_DEPTH>;

/// Cloneable handle to a bounded MPMC notification channel.
#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<RawQueue>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Channel::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Wait for the next intent.
    pub async fn receive(&self) -> Notification {
        self.inner.receive().await
    }

    pub fn try_receive(&self) -> Option<Notification> {
        self.inner.try_receive().ok()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationPort for NotificationQueue {
    fn enqueue(&mut self, notification: Notification) -> Result<(), NotifyError> {
        self.inner.try_send(notification).map_err(|_| {
            warn!(
                "notify: queue full, dropping {}",
                notification.summary()
            );
            NotifyError::QueueFull
        })
    }
}
