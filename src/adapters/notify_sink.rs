//! Notification sink that only writes to the log.
//!
//! Used when no webhook endpoint is configured (or the `webhook` feature
//! is off) so alerts still leave a trace.

use log::warn;

use crate::app::ports::NotificationSink;
use crate::error::NotifyError;
use crate::notify::Notification;

#[derive(Debug, Default)]
pub struct LogNotificationSink {
    delivered: u32,
}

impl LogNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> u32 {
        self.delivered
    }
}

impl NotificationSink for LogNotificationSink {
    fn deliver(&mut self, notification: &Notification) -> Result<(), NotifyError> {
        self.delivered += 1;
        warn!(
            "NOTIFY | {} | stage={} at {}ms",
            notification.summary(),
            notification.stage.as_str(),
            notification.timestamp_ms
        );
        Ok(())
    }
}
