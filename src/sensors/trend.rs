//! Short-horizon trend of a smoothed channel.
//!
//! The slope is the change over the last [`TREND_SPAN`] samples, or zero
//! until that much history exists.

use heapless::HistoryBuffer;

/// Samples between the two points of the slope.
pub const TREND_SPAN: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct TrendWindow {
    history: HistoryBuffer<f32, { TREND_SPAN + 1 }>,
}

impl TrendWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f32) {
        self.history.write(value);
    }

    /// `latest - value TREND_SPAN samples ago`, 0.0 while filling.
    pub fn slope(&self) -> f32 {
        if self.history.len() <= TREND_SPAN {
            return 0.0;
        }
        match (self.history.oldest_ordered().next(), self.history.recent()) {
            (Some(oldest), Some(latest)) => latest - oldest,
            _ => 0.0,
        }
    }
}
