//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the climate station: the
//! per-tick control cycle, command handling and configuration lifecycle.
//! All interaction with sensors, actuators, clocks, storage and
//! notification delivery happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod cycle;
pub mod events;
pub mod ports;
pub mod service;
