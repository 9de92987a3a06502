//! swarmscale-notify — notification channels for applied scale actions.
//!
//! Notifications are best-effort: callers log failures and move on.

pub mod slack;

use tracing::debug;

use swarmscale_core::{BoxFuture, NotificationFailure, Notifier};

pub use slack::SlackNotifier;

/// Notifier used when no channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), NotificationFailure>> {
        debug!(text = message, "notifications disabled");
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_always_succeeds() {
        assert!(NoopNotifier.notify("docker service web scaled to 2").await.is_ok());
    }
}
