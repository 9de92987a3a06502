//! swarmscale-api — HTTP surface for the scaler.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/` | Alertmanager webhook; scales the services named in the alerts |
//! | GET | `/healthz` | Liveness probe |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use swarmscale_autoscale::AlertBatchProcessor;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub processor: Arc<AlertBatchProcessor>,
}

/// Build the scaler router.
pub fn build_router(processor: Arc<AlertBatchProcessor>) -> Router {
    let state = ApiState { processor };

    Router::new()
        .route("/", post(handlers::receive_alerts))
        .route("/healthz", get(handlers::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
