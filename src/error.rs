//! Unified error types for the climate engine.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the control loop's error handling uniform.  All variants are `Copy` so
//! they can be passed through the service and the dispatcher without
//! allocation.
//!
//! The control tick itself is infallible: configuration problems are
//! resolved by defaults and clamping before a tick runs, and notification
//! delivery failures stay inside the dispatcher.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A configuration document or patch could not be used.
    Config(ConfigError),
    /// A notification could not be queued or delivered.
    Notify(NotifyError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Notify(e) => write!(f, "notify: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not a JSON object at all.
    Garbled,
    /// The document is an object but a field has the wrong type.
    InvalidDocument,
    /// A stored blob failed to decode.
    Corrupted,
    /// No configuration stored under the requested key.
    NotFound,
    /// A field failed range validation before persisting.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Garbled => write!(f, "document is not a configuration object"),
            Self::InvalidDocument => write!(f, "field of the wrong type"),
            Self::Corrupted => write!(f, "stored configuration corrupted"),
            Self::NotFound => write!(f, "configuration not found"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Notification errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyError {
    /// The outbound queue is full; the intent was dropped.
    QueueFull,
    /// No sink endpoint is configured.
    NoEndpoint,
    /// The sink rejected or failed to deliver the notification.
    DeliveryFailed,
    /// Delivery was abandoned after the retry budget ran out.
    RetriesExhausted,
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "notification queue full"),
            Self::NoEndpoint => write!(f, "no notification endpoint configured"),
            Self::DeliveryFailed => write!(f, "delivery failed"),
            Self::RetriesExhausted => write!(f, "retries exhausted"),
        }
    }
}

impl From<NotifyError> for Error {
    fn from(e: NotifyError) -> Self {
        Self::Notify(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
