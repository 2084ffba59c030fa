//! Webhook notification sink (`webhook` feature).
//!
//! POSTs each notification as JSON to `alerts.webhookUrl`, read from the
//! live configuration on every delivery.  Runs on the dispatcher thread,
//! so the blocking client is fine here.

use std::time::Duration;

use anyhow::Context;
use log::info;
use serde::Serialize;

use crate::app::ports::NotificationSink;
use crate::config::ConfigHandle;
use crate::error::NotifyError;
use crate::notify::Notification;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Payload<'a> {
    farm: &'a str,
    message: String,
    #[serde(flatten)]
    notification: &'a Notification,
}

pub struct WebhookSink {
    client: reqwest::blocking::Client,
    config: ConfigHandle,
}

impl WebhookSink {
    pub fn new(config: ConfigHandle) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .user_agent(concat!("broiler-climate/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self { client, config })
    }
}

impl NotificationSink for WebhookSink {
    fn deliver(&mut self, notification: &Notification) -> Result<(), NotifyError> {
        let cfg = self.config.snapshot();
        let url = cfg.alerts.webhook_url.trim();
        if url.is_empty() {
            return Err(NotifyError::NoEndpoint);
        }
        let payload = Payload {
            farm: &cfg.general.farm_name,
            message: notification.summary(),
            notification,
        };
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .map_err(|_| NotifyError::DeliveryFailed)?;
        if !response.status().is_success() {
            return Err(NotifyError::DeliveryFailed);
        }
        info!("NOTIFY | webhook accepted {}", notification.summary());
        Ok(())
    }
}
