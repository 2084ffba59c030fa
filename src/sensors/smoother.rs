//! Trailing-window moving average with calibration offset.
//!
//! Each channel keeps at most the last `window` raw values in a
//! fixed-capacity deque.  The window is read fresh from configuration on
//! every sample: shrinking it drops the oldest values immediately,
//! growing it lets the history refill naturally (no back-filling).

use heapless::Deque;

use super::{RawSample, SmoothedSample};
use crate::config::{MAX_SMOOTH_WINDOW, SensorConfig};

/// Per-channel smoothing history.
#[derive(Debug, Clone, Default)]
pub struct SampleSmoother {
    temp: ChannelWindow,
    lux: ChannelWindow,
}

impl SampleSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `sample` into the history and return the smoothed reading.
    pub fn smooth(&mut self, sample: &RawSample, cfg: &SensorConfig) -> SmoothedSample {
        let temp = self.temp.push(sample.temperature, cfg.smooth_window_temp as usize);
        let lux = self.lux.push(sample.lux, cfg.smooth_window_lux as usize);
        SmoothedSample {
            timestamp_ms: sample.timestamp_ms,
            temperature: temp + cfg.temp_offset,
            lux: lux + cfg.lux_offset,
        }
    }

    /// Number of raw values currently held for (temperature, lux).
    pub fn depth(&self) -> (usize, usize) {
        (self.temp.buf.len(), self.lux.buf.len())
    }
}

#[derive(Debug, Clone, Default)]
struct ChannelWindow {
    buf: Deque<f32, MAX_SMOOTH_WINDOW>,
}

impl ChannelWindow {
    fn push(&mut self, raw: f32, window: usize) -> f32 {
        let window = window.clamp(1, MAX_SMOOTH_WINDOW);
        while self.buf.len() >= window {
            self.buf.pop_front();
        }
        // len < window <= capacity after trimming.
        let _ = self.buf.push_back(raw);
        let sum: f32 = self.buf.iter().sum();
        sum / self.buf.len() as f32
    }
}
