//! Host clock adapter.
//!
//! Monotonic time comes from `std::time::Instant`; the local wall clock
//! (for the night window) from `chrono::Local`.

use std::time::Instant;

use chrono::{Datelike, Local, Timelike};

use crate::app::ports::ClockPort;

/// Wall-clock years before this are treated as "never synced".
const MIN_SYNCED_YEAR: i32 = 2020;

pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl ClockPort for SystemClock {
    fn monotonic_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn minute_of_day(&self) -> Option<u16> {
        let now = Local::now();
        if now.year() < MIN_SYNCED_YEAR {
            return None;
        }
        Some((now.hour() * 60 + now.minute()) as u16)
    }
}
