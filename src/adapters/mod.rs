//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                   |
//! |----------------|--------------------|-------------------------------|
//! | `hardware`     | SensorPort         | sample source                 |
//! |                | ActuatorPort       | `embedded-hal` PWM channels   |
//! | `log_sink`     | EventSink          | `log` facade                  |
//! | `memory_store` | ConfigPort         | in-memory postcard blobs      |
//! | `notify_sink`  | NotificationSink   | `log` facade                  |
//! | `pwm`          | -                  | `SetDutyCycle` channels       |
//! | `sim_sensor`   | SensorPort         | simulated house               |
//! | `time`         | ClockPort          | `Instant` + local wall clock  |
//! | `webhook`      | NotificationSink   | HTTP POST (`webhook` feature) |

pub mod hardware;
pub mod log_sink;
pub mod memory_store;
pub mod notify_sink;
pub mod pwm;
pub mod sim_sensor;
pub mod time;
#[cfg(feature = "webhook")]
pub mod webhook;
