//! swarmscale-core — shared vocabulary for the alert-driven scaler.
//!
//! Holds the alert payload model, replica snapshots and bounds, the
//! narrow traits the decision core uses to reach the orchestrator and
//! the notification channel, and the daemon configuration.

pub mod config;
pub mod error;
pub mod ports;
pub mod types;

pub use config::ScalerConfig;
pub use error::*;
pub use ports::{BoxFuture, Notifier, ReplicaStateProvider, ScaleCommandExecutor};
pub use types::*;
