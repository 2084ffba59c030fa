//! Hardware adapter: bridges the sample source and the PWM outputs to
//! the domain port traits.
//!
//! Owns the sensor source and both PWM outputs, exposing them through
//! [`SensorPort`] and [`ActuatorPort`] so the service can take a single
//! `&mut (impl SensorPort + ActuatorPort)`.

use embedded_hal::pwm::SetDutyCycle;

use super::pwm::PwmOutput;
use crate::app::cycle::DutyCommand;
use crate::app::ports::{ActuatorPort, SensorPort};
use crate::sensors::RawSample;

pub struct HardwareAdapter<S, F, L> {
    sensor: S,
    fan: PwmOutput<F>,
    led: PwmOutput<L>,
}

impl<S, F, L> HardwareAdapter<S, F, L>
where
    S: SensorPort,
    F: SetDutyCycle,
    L: SetDutyCycle,
{
    pub fn new(sensor: S, fan: F, led: L) -> Self {
        Self {
            sensor,
            fan: PwmOutput::new("fan", fan),
            led: PwmOutput::new("led", led),
        }
    }

    pub fn fan(&self) -> &PwmOutput<F> {
        &self.fan
    }

    pub fn led(&self) -> &PwmOutput<L> {
        &self.led
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<S: SensorPort, F, L> SensorPort for HardwareAdapter<S, F, L> {
    fn read_sample(&mut self) -> Option<RawSample> {
        self.sensor.read_sample()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<S, F: SetDutyCycle, L: SetDutyCycle> ActuatorPort for HardwareAdapter<S, F, L> {
    fn apply(&mut self, command: &DutyCommand) {
        self.fan.set(command.fan_duty, command.fan_freq_hz);
        self.led.set(command.led_duty, command.led_freq_hz);
    }
}
