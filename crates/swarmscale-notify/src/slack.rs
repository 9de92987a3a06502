//! Slack incoming-webhook notification channel.

use serde::Serialize;
use tracing::debug;

use swarmscale_core::{BoxFuture, NotificationFailure, Notifier};

/// Posts plain-text messages to a Slack incoming webhook.
pub struct SlackNotifier {
    webhook_url: String,
    username: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize, PartialEq)]
struct SlackPayload<'a> {
    username: &'a str,
    text: &'a str,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            username: username.into(),
            client: reqwest::Client::new(),
        }
    }

    fn payload<'a>(&'a self, message: &'a str) -> SlackPayload<'a> {
        SlackPayload {
            username: &self.username,
            text: message,
        }
    }

    async fn post(&self, message: &str) -> Result<(), NotificationFailure> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| NotificationFailure(format!("slack request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationFailure(format!("slack returned {status}: {body}")));
        }

        debug!("slack notification sent");
        Ok(())
    }
}

impl std::fmt::Debug for SlackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackNotifier")
            .field("webhook_url", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

impl Notifier for SlackNotifier {
    fn notify<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), NotificationFailure>> {
        Box::pin(self.post(message))
    }
}
