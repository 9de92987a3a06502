//! swarmscale-autoscale — alert-driven replica scaling.
//!
//! Turns one webhook delivery into per-service scale actions. Each
//! alert names a service; the processor reads the service's replica
//! counts, asks the decision engine for the next target, and drives the
//! executor.
//!
//! # Decision Rules
//!
//! ```text
//! firing:
//!     current >= max           -> reject (bound)
//!     current <  target        -> reject (previous scale-up in flight)
//!     otherwise                -> scale to current + 1, refresh image
//!
//! resolved:
//!     target  <= min           -> reject (bound)
//!     current <= target - 1    -> reject (previous scale-down in flight)
//!     otherwise                -> scale to target - 1
//! ```
//!
//! Scale-down steps from the orchestrator's target rather than the
//! observed count, so a redelivered "resolved" alert cannot push a
//! service below its bound while an earlier update is still rolling out.
//! Fetch, decide and apply run under a per-service lock.

pub mod engine;
pub mod locks;
pub mod processor;

pub use engine::{RejectReason, ScaleDecision, decide};
pub use locks::ServiceLocks;
pub use processor::{AlertBatchProcessor, ProcessorSettings};
