//! Scale decision engine.
//!
//! Pure function of the alert status, the orchestrator's replica
//! snapshot, and the bounds. No I/O.

use std::fmt;

use swarmscale_core::{AlertStatus, ReplicaState, ScaleBounds, ScaleCommand};

/// Why a decision did not produce an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The action would leave the configured replica range.
    BoundExceeded,
    /// A previous action has not propagated yet.
    NotConverged,
    /// The batch status is neither firing nor resolved.
    UnknownStatus,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::BoundExceeded => "bound_exceeded",
            RejectReason::NotConverged => "not_converged",
            RejectReason::UnknownStatus => "unknown_status",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scaling decision for a single service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Hand this command to the executor.
    Apply(ScaleCommand),
    /// No action this round.
    Rejected(RejectReason),
}

impl ScaleDecision {
    fn scale_up(replicas: u32) -> Self {
        ScaleDecision::Apply(ScaleCommand {
            replicas,
            refresh_image: true,
        })
    }

    fn scale_down(replicas: u32) -> Self {
        ScaleDecision::Apply(ScaleCommand {
            replicas,
            refresh_image: false,
        })
    }

    /// New replica count, if this decision applies one.
    pub fn replicas(&self) -> Option<u32> {
        match self {
            ScaleDecision::Apply(cmd) => Some(cmd.replicas),
            ScaleDecision::Rejected(_) => None,
        }
    }
}

/// Decide the next replica target for a service.
pub fn decide(status: &AlertStatus, state: ReplicaState, bounds: ScaleBounds) -> ScaleDecision {
    let ReplicaState { current, target } = state;

    match status {
        AlertStatus::Firing => {
            if current >= bounds.max {
                ScaleDecision::Rejected(RejectReason::BoundExceeded)
            } else if current < target {
                ScaleDecision::Rejected(RejectReason::NotConverged)
            } else {
                ScaleDecision::scale_up(current + 1)
            }
        }
        AlertStatus::Resolved => {
            if target <= bounds.min {
                ScaleDecision::Rejected(RejectReason::BoundExceeded)
            } else if current < target {
                // current <= target - 1; target > min >= 1 so no underflow.
                ScaleDecision::Rejected(RejectReason::NotConverged)
            } else {
                ScaleDecision::scale_down(target - 1)
            }
        }
        AlertStatus::Unknown(_) => ScaleDecision::Rejected(RejectReason::UnknownStatus),
    }
}
