//! Actuator control: age presets, duty mapping, mode caps and status.

pub mod duty;
pub mod overlay;
pub mod preset;
pub mod status;
