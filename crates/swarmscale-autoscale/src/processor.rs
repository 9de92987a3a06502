//! Alert batch processor.
//!
//! Walks a delivery in payload order and produces exactly one
//! `ServiceResult` per alert. Per-service failures are recorded on that
//! service's entry and never stop the rest of the batch.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use swarmscale_core::*;

use crate::engine::{RejectReason, ScaleDecision, decide};
use crate::locks::ServiceLocks;

/// Tunables for the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorSettings {
    pub bounds: ScaleBounds,
    /// Upper bound on each fetch and notify call.
    pub step_timeout: Duration,
    /// Upper bound on one whole apply. The executor bounds its own
    /// commands more tightly so partial progress can be reported.
    pub apply_timeout: Duration,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            bounds: ScaleBounds::DEFAULT,
            step_timeout: Duration::from_secs(30),
            apply_timeout: Duration::from_secs(120),
        }
    }
}

/// Result of the locked fetch/decide/apply section for one service.
enum Outcome {
    Applied(u32),
    /// Scaled to the count, but a later step of the action failed.
    PartiallyApplied(u32, String),
    Rejected(RejectReason, ReplicaState),
    Failed(String),
}

/// Converts alert batches into scale actions.
pub struct AlertBatchProcessor {
    provider: Arc<dyn ReplicaStateProvider>,
    executor: Arc<dyn ScaleCommandExecutor>,
    notifier: Arc<dyn Notifier>,
    locks: ServiceLocks,
    settings: ProcessorSettings,
}

impl AlertBatchProcessor {
    pub fn new(
        provider: Arc<dyn ReplicaStateProvider>,
        executor: Arc<dyn ScaleCommandExecutor>,
        notifier: Arc<dyn Notifier>,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            provider,
            executor,
            notifier,
            locks: ServiceLocks::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    /// Process one delivery. Output order matches alert order.
    pub async fn process(&self, batch: &AlertBatch) -> Vec<ServiceResult> {
        let known_status = !matches!(batch.status, AlertStatus::Unknown(_));
        if !known_status {
            warn!(
                status = %batch.status,
                alerts = batch.alerts.len(),
                reason = %RejectReason::UnknownStatus,
                "unknown alert status, no action taken"
            );
        }

        let mut results = Vec::with_capacity(batch.alerts.len());

        for alert in &batch.alerts {
            let raw = alert.service();
            if raw.is_empty() {
                debug!("alert has no service annotation");
                results.push(ServiceResult::no_action(""));
                continue;
            }

            let service = match ServiceName::parse(raw) {
                Ok(s) => s,
                Err(e) => {
                    warn!(service = raw, error = %e, "rejecting alert");
                    results.push(ServiceResult::failed(raw, e.to_string()));
                    continue;
                }
            };

            if !known_status {
                results.push(ServiceResult::no_action(raw));
                continue;
            }

            results.push(self.process_service(&batch.status, &service).await);
        }

        results
    }

    async fn process_service(&self, status: &AlertStatus, service: &ServiceName) -> ServiceResult {
        let outcome = {
            let _guard = self.locks.lock(service).await;
            self.fetch_decide_apply(status, service).await
        };

        match outcome {
            Outcome::Applied(replicas) => {
                self.notify(service, replicas).await;
                ServiceResult::scaled(service.as_str(), replicas)
            }
            Outcome::Rejected(reason, state) => {
                info!(
                    service = %service,
                    %status,
                    %reason,
                    current = state.current,
                    target = state.target,
                    "scale rejected"
                );
                ServiceResult::no_action(service.as_str())
            }
            Outcome::PartiallyApplied(replicas, detail) => {
                self.notify(service, replicas).await;
                ServiceResult::scaled_with_error(service.as_str(), replicas, detail)
            }
            Outcome::Failed(detail) => ServiceResult::failed(service.as_str(), detail),
        }
    }

    /// Runs with the service's lock held.
    async fn fetch_decide_apply(&self, status: &AlertStatus, service: &ServiceName) -> Outcome {
        let timeout = self.settings.step_timeout;

        let state = match tokio::time::timeout(timeout, self.provider.fetch(service)).await {
            Ok(Ok(state)) => state,
            Ok(Err(e)) => {
                warn!(service = %service, error = %e, "replica state unavailable");
                return Outcome::Failed(e.to_string());
            }
            Err(_) => {
                let e = StateUnavailable::new(service.as_str(), format!("timed out after {timeout:?}"));
                warn!(service = %service, error = %e, "replica state unavailable");
                return Outcome::Failed(e.to_string());
            }
        };

        let command = match decide(status, state, self.settings.bounds) {
            ScaleDecision::Apply(command) => command,
            ScaleDecision::Rejected(reason) => return Outcome::Rejected(reason, state),
        };

        debug!(
            service = %service,
            from = %state,
            to = command.replicas,
            refresh_image = command.refresh_image,
            dry_run = self.executor.dry_run(),
            "applying scale"
        );

        let apply_timeout = self.settings.apply_timeout;
        match tokio::time::timeout(apply_timeout, self.executor.apply(service, command)).await {
            Ok(Ok(())) => {
                info!(service = %service, replicas = command.replicas, "service scaled");
                Outcome::Applied(command.replicas)
            }
            Ok(Err(e)) => match e.scaled_to {
                Some(replicas) => {
                    warn!(service = %service, replicas, error = %e, "service scaled, follow-up step failed");
                    Outcome::PartiallyApplied(replicas, e.to_string())
                }
                None => {
                    warn!(service = %service, error = %e, "scale command failed");
                    Outcome::Failed(e.to_string())
                }
            },
            Err(_) => {
                let e = CommandFailure::new(
                    service.as_str(),
                    format!("timed out after {apply_timeout:?}"),
                );
                warn!(service = %service, error = %e, "scale command failed");
                Outcome::Failed(e.to_string())
            }
        }
    }

    async fn notify(&self, service: &ServiceName, replicas: u32) {
        let mut message = format!("docker service {service} scaled to {replicas}");
        if self.executor.dry_run() {
            message.push_str(" (dry run)");
        }

        match tokio::time::timeout(self.settings.step_timeout, self.notifier.notify(&message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(service = %service, error = %e, "notification failed"),
            Err(_) => warn!(service = %service, "notification timed out"),
        }
    }
}
