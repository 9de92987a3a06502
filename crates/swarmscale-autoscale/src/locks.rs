//! Per-service exclusive sections.
//!
//! Concurrent deliveries naming the same service must not interleave
//! their fetch/decide/apply steps. Each service name maps to its own
//! async mutex; unrelated services never contend.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use swarmscale_core::ServiceName;

/// Keyed async mutex over service names.
#[derive(Clone, Default)]
pub struct ServiceLocks {
    locks: Arc<Mutex<HashMap<ServiceName, Arc<Mutex<()>>>>>,
}

impl ServiceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `service`.
    ///
    /// The guard releases on drop, including when the awaiting future is
    /// cancelled.
    pub async fn lock(&self, service: &ServiceName) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries only referenced by the map are idle.
            locks.retain(|name, lock| name == service || Arc::strong_count(lock) > 1);
            locks
                .entry(service.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of services currently tracked.
    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn name(s: &str) -> ServiceName {
        ServiceName::parse(s).unwrap()
    }

    #[tokio::test]
    async fn same_service_is_exclusive() {
        let locks = ServiceLocks::new();
        let guard = locks.lock(&name("web")).await;

        let second = tokio::time::timeout(Duration::from_millis(50), locks.lock(&name("web"))).await;
        assert!(second.is_err(), "second lock should block while first is held");

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(50), locks.lock(&name("web"))).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn different_services_do_not_contend() {
        let locks = ServiceLocks::new();
        let _web = locks.lock(&name("web")).await;
        let api = tokio::time::timeout(Duration::from_millis(50), locks.lock(&name("api"))).await;
        assert!(api.is_ok());
    }

    #[tokio::test]
    async fn cancelled_waiter_does_not_hold_lock() {
        let locks = ServiceLocks::new();
        let guard = locks.lock(&name("web")).await;

        // Times out while waiting; the future is dropped.
        let _ = tokio::time::timeout(Duration::from_millis(10), locks.lock(&name("web"))).await;
        drop(guard);

        let next = tokio::time::timeout(Duration::from_millis(50), locks.lock(&name("web"))).await;
        assert!(next.is_ok());
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = ServiceLocks::new();
        for i in 0..10 {
            let _guard = locks.lock(&name(&format!("svc-{i}"))).await;
        }
        // Each call prunes the previously released entries.
        assert_eq!(locks.tracked().await, 1);
    }
}
