//! Collaborator traits consumed by the decision core.
//!
//! The processor only ever talks to the orchestrator and the notification
//! channel through these traits, so tests substitute in-memory fakes and
//! the daemon plugs in the Docker Swarm and Slack implementations.
//!
//! Methods return boxed futures so the traits stay object-safe and can be
//! held as `Arc<dyn ...>`.

use std::future::Future;
use std::pin::Pin;

use crate::error::{CommandFailure, NotificationFailure, StateUnavailable};
use crate::types::{ReplicaState, ScaleCommand, ServiceName};

/// Boxed future alias used by every collaborator trait.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Reads a service's replica counts from the orchestrator.
///
/// Implementations must not cache: the convergence gate in the decision
/// engine relies on a fresh snapshot for every decision.
pub trait ReplicaStateProvider: Send + Sync {
    fn fetch<'a>(
        &'a self,
        service: &'a ServiceName,
    ) -> BoxFuture<'a, Result<ReplicaState, StateUnavailable>>;
}

/// Applies a scale decision against the orchestrator.
pub trait ScaleCommandExecutor: Send + Sync {
    fn apply<'a>(
        &'a self,
        service: &'a ServiceName,
        command: ScaleCommand,
    ) -> BoxFuture<'a, Result<(), CommandFailure>>;

    /// When true, `apply` performs no side effect and reports success.
    fn dry_run(&self) -> bool {
        false
    }
}

/// Best-effort channel for reporting applied actions.
pub trait Notifier: Send + Sync {
    fn notify<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), NotificationFailure>>;
}
