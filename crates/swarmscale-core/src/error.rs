//! Error types shared across the scaler crates.

use thiserror::Error;

/// The orchestrator could not report replica counts for a service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("replica state unavailable for {service}: {detail}")]
pub struct StateUnavailable {
    pub service: String,
    pub detail: String,
}

impl StateUnavailable {
    pub fn new(service: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            detail: detail.into(),
        }
    }
}

/// A scale command was attempted and did not succeed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("scale command failed for {service}: {detail}")]
pub struct CommandFailure {
    pub service: String,
    pub detail: String,
    /// Set when the replica count change already took effect and a later
    /// step of the same action (image refresh) failed.
    pub scaled_to: Option<u32>,
}

impl CommandFailure {
    pub fn new(service: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            detail: detail.into(),
            scaled_to: None,
        }
    }

    /// Failure after the service was already scaled to `replicas`.
    pub fn after_scale(service: impl Into<String>, replicas: u32, detail: impl Into<String>) -> Self {
        Self {
            scaled_to: Some(replicas),
            ..Self::new(service, detail)
        }
    }
}

/// The notification channel rejected or never received a message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("notification failed: {0}")]
pub struct NotificationFailure(pub String);

/// Errors raised while validating domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid service name: {0:?}")]
    InvalidServiceName(String),

    #[error("invalid scale bounds: min {min}, max {max} (need 1 <= min <= max)")]
    InvalidBounds { min: u32, max: u32 },
}
