//! Simulated poultry-house sensor for the host binary.
//!
//! Temperature swings ±2 °C around 27 °C on a ~63 min period, light
//! rises up to +8 lx above 15 lx on a ~52 min period, both with a little
//! deterministic noise.  Every `dropout_every`-th read returns no sample.

use crate::app::ports::SensorPort;
use crate::sensors::RawSample;

pub struct SimulatedSensor {
    t_ms: u64,
    step_ms: u64,
    temp_bias: f32,
    noise: u32,
    reads: u32,
    dropout_every: Option<u32>,
}

impl SimulatedSensor {
    pub fn new(step_ms: u64, seed: u32) -> Self {
        Self {
            t_ms: 0,
            step_ms,
            temp_bias: 0.0,
            noise: seed.max(1),
            reads: 0,
            dropout_every: None,
        }
    }

    /// Drop every `n`-th sample (0 disables).
    pub fn with_dropout(mut self, n: u32) -> Self {
        self.dropout_every = (n > 0).then_some(n);
        self
    }

    /// Shift the temperature curve (heat wave / cold snap).
    pub fn set_temp_bias(&mut self, bias: f32) {
        self.temp_bias = bias;
    }

    /// Uniform value in [-0.5, 0.5).
    fn jitter(&mut self) -> f32 {
        // xorshift32
        let mut x = self.noise;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise = x;
        (x as f32 / u32::MAX as f32) - 0.5
    }
}

impl SensorPort for SimulatedSensor {
    fn read_sample(&mut self) -> Option<RawSample> {
        self.t_ms += self.step_ms;
        self.reads += 1;
        if self.dropout_every.is_some_and(|n| self.reads % n == 0) {
            return None;
        }
        let t = self.t_ms as f32;
        let temp_base = 27.0 + (t / 600_000.0).sin() * 2.0 + self.temp_bias;
        let lux_base = 15.0 + ((t / 500_000.0).sin() * 8.0).max(0.0);
        let temperature = temp_base + self.jitter() * 0.4;
        let lux = lux_base + self.jitter() * 1.8;
        Some(RawSample {
            timestamp_ms: self.t_ms,
            temperature: (temperature * 100.0).round() / 100.0,
            lux: (lux * 10.0).round() / 10.0,
        })
    }
}
