//! Broiler-house climate control and alert decision engine.
//!
//! Exposes the pure-logic modules for integration testing and embedding.
//! Everything that touches I/O sits behind the port traits in
//! [`app::ports`]; concrete implementations live in [`adapters`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod alert;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod notify;
pub mod runner;
pub mod sensors;
