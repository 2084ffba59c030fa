//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each application event as one
//! structured line through the `log` facade.  A dashboard feed would
//! implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | #{} | T={:.2}\u{00b0}C [{}] | L={:.1}lx [{}] | fan={} led={} | \
                     alerts temp={} lux={} | night={} quiet={}",
                    t.tick,
                    t.temperature,
                    t.temp_badge.as_str(),
                    t.lux,
                    t.lux_badge.as_str(),
                    t.command.fan_duty,
                    t.command.led_duty,
                    t.temp_alert.as_str(),
                    t.lux_alert.as_str(),
                    t.night,
                    t.quiet,
                );
            }
            AppEvent::Alert(n) => {
                warn!("ALERT | {}", n.summary());
            }
            AppEvent::ConfigChanged(source) => {
                info!("CONFIG | changed ({:?})", source);
            }
            AppEvent::ConfigRejected(e) => {
                warn!("CONFIG | rejected: {}", e);
            }
            AppEvent::ConfigExported(json) => {
                info!("CONFIG | export {} bytes", json.len());
            }
            AppEvent::ConfigSaved => {
                info!("CONFIG | saved");
            }
            AppEvent::ActuatorsReset => {
                info!("ACT | reset");
            }
            AppEvent::Started { interval_ms } => {
                info!("START | interval={}ms", interval_ms);
            }
        }
    }
}
