//! Webhook handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use swarmscale_core::{AlertBatch, ServicesResponse};

use crate::ApiState;

fn plain_error(status: StatusCode, msg: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], msg).into_response()
}

/// POST /
///
/// The body is decoded by hand rather than with the `Json` extractor so
/// senders that omit or mislabel the content type are still served, and
/// every decode failure maps to 400.
pub async fn receive_alerts(State(state): State<ApiState>, body: Bytes) -> Response {
    let batch: AlertBatch = match serde_json::from_slice(&body) {
        Ok(batch) => batch,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "malformed alert payload");
            return plain_error(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    debug!(status = %batch.status, alerts = batch.alerts.len(), "alert batch received");

    let results = state.processor.process(&batch).await;
    let response = ServicesResponse::ok(results);

    match serde_json::to_vec(&response) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => plain_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use swarmscale_autoscale::{AlertBatchProcessor, ProcessorSettings};
    use swarmscale_core::*;

    /// Every service sits at 1/1 and every command succeeds.
    struct SteadySwarm;

    impl ReplicaStateProvider for SteadySwarm {
        fn fetch<'a>(
            &'a self,
            _service: &'a ServiceName,
        ) -> BoxFuture<'a, Result<ReplicaState, StateUnavailable>> {
            Box::pin(async { Ok(ReplicaState::new(1, 1)) })
        }
    }

    impl ScaleCommandExecutor for SteadySwarm {
        fn apply<'a>(
            &'a self,
            _service: &'a ServiceName,
            _command: ScaleCommand,
        ) -> BoxFuture<'a, Result<(), CommandFailure>> {
            Box::pin(async { Ok(()) })
        }
    }

    impl Notifier for SteadySwarm {
        fn notify<'a>(&'a self, _message: &'a str) -> BoxFuture<'a, Result<(), NotificationFailure>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn test_state() -> ApiState {
        let swarm = Arc::new(SteadySwarm);
        ApiState {
            processor: Arc::new(AlertBatchProcessor::new(
                swarm.clone(),
                swarm.clone(),
                swarm,
                ProcessorSettings::default(),
            )),
        }
    }

    async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn empty_body_is_bad_request() {
        let resp = receive_alerts(State(test_state()), Bytes::new()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(resp).await.contains("EOF"));
    }

    #[tokio::test]
    async fn non_json_is_bad_request() {
        let resp = receive_alerts(State(test_state()), Bytes::from_static(b"not json")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
    }

    #[tokio::test]
    async fn firing_alert_scales() {
        let body = br#"{"status":"firing","alerts":[{"annotations":{"service":"svc-a"}}]}"#;
        let resp = receive_alerts(State(test_state()), Bytes::from_static(body)).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_string(resp).await,
            r#"{"Service":[{"Name":"svc-a","Scale":2}],"Status":"OK"}"#
        );
    }

    #[tokio::test]
    async fn healthz_ok() {
        let resp = healthz().await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
