//! Sensor samples and conditioning.
//!
//! Raw samples arrive from the ingestion boundary once per sampling
//! interval.  The [`SampleSmoother`] turns each one into a
//! [`SmoothedSample`] (trailing mean plus calibration offset); no raw
//! history beyond the smoothing windows is retained.

pub mod smoother;
pub mod trend;

use serde::{Deserialize, Serialize};

pub use smoother::SampleSmoother;
pub use trend::TrendWindow;

/// One reading from the ingestion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSample {
    /// Timestamp assigned at ingestion (ms).
    pub timestamp_ms: u64,
    /// Air temperature (°C).
    pub temperature: f32,
    /// Illuminance (lux).
    pub lux: f32,
}

/// Offset-corrected, window-averaged reading.  Derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmoothedSample {
    pub timestamp_ms: u64,
    pub temperature: f32,
    pub lux: f32,
}
