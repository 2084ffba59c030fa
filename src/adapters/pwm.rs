//! PWM output over `embedded-hal` 1.0 [`SetDutyCycle`].
//!
//! Duty commands are on the 0–255 scale and are handed to the channel as
//! a fraction of 255, so any HAL PWM driver works whatever its native
//! resolution.  `embedded-hal` has no frequency API: the requested
//! frequency is tracked and a change is logged for the platform layer
//! that configures the timer.

use core::convert::Infallible;

use embedded_hal::pwm::{Error as _, ErrorType, SetDutyCycle};
use log::{info, warn};

pub struct PwmOutput<P> {
    name: &'static str,
    channel: P,
    duty: u8,
    freq_hz: Option<u32>,
}

impl<P: SetDutyCycle> PwmOutput<P> {
    pub fn new(name: &'static str, channel: P) -> Self {
        Self {
            name,
            channel,
            duty: 0,
            freq_hz: None,
        }
    }

    pub fn set(&mut self, duty: u8, freq_hz: u32) {
        if self.freq_hz != Some(freq_hz) {
            info!("PWM[{}]: frequency {} Hz", self.name, freq_hz);
            self.freq_hz = Some(freq_hz);
        }
        if duty == self.duty {
            return;
        }
        match self.channel.set_duty_cycle_fraction(u16::from(duty), 255) {
            Ok(()) => self.duty = duty,
            Err(e) => warn!("PWM[{}]: set duty {} failed: {:?}", self.name, duty, e.kind()),
        }
    }

    pub fn duty(&self) -> u8 {
        self.duty
    }

    pub fn freq_hz(&self) -> Option<u32> {
        self.freq_hz
    }

    pub fn channel(&self) -> &P {
        &self.channel
    }
}

/// In-memory PWM channel for the host simulator and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPwmChannel {
    max: u16,
    duty: u16,
}

impl SimPwmChannel {
    /// A channel with `max` steps of resolution (e.g. 1023 for 10 bit).
    pub fn new(max: u16) -> Self {
        Self { max: max.max(1), duty: 0 }
    }

    pub fn raw_duty(&self) -> u16 {
        self.duty
    }
}

impl ErrorType for SimPwmChannel {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwmChannel {
    fn max_duty_cycle(&self) -> u16 {
        self.max
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty = duty.min(self.max);
        Ok(())
    }
}
