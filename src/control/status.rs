//! Per-channel status badge shown next to the live readings.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub enum Badge {
    #[default]
    Ok,
    Warn,
    Alert,
}

impl Badge {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warn => "WARN",
            Self::Alert => "ALERT",
        }
    }
}

const ALERT_SLOPE: f32 = 0.6;
const WARN_SLOPE: f32 = 0.3;

/// Classify a channel from its setpoint deviation and its short-term slope.
///
/// `deviation` is `value - setpoint` (sign matters for the Alert rule: only
/// overshoot above the band escalates to Alert).
pub fn classify(deviation: f32, hys: f32, slope: f32) -> Badge {
    if deviation > hys || slope > ALERT_SLOPE {
        Badge::Alert
    } else if deviation.abs() > hys / 2.0 || slope.abs() > WARN_SLOPE {
        Badge::Warn
    } else {
        Badge::Ok
    }
}
