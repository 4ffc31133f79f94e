//! Liveness, status, and graceful-shutdown endpoints.

use axum::Json;
use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use basecamp_core::version::Version;
use serde::Serialize;

use crate::state::AppState;

/// `GET /ping` — unauthenticated liveness probe.
async fn ping() -> &'static str {
    "pong"
}

/// Response body for `GET /status`.
#[derive(Debug, Serialize)]
struct StatusResponse {
    version: String,
    region: String,
    listen_addr: String,
    listen_port: u16,
    subscriber_count: usize,
}

/// `GET /status` — daemon identity and a cheap snapshot of the running
/// configuration, for operator health checks.
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: Version::current().to_string(),
        region: state.config.region.clone(),
        listen_addr: state.config.listen_addr.clone(),
        listen_port: state.config.listen_port,
        subscriber_count: state.events.subscriber_count(),
    })
}

/// `POST /shutdown` — request graceful shutdown. Equivalent to sending
/// `SIGTERM`: the scan loops and the axum server both drain in-flight
/// work and exit on their own schedule.
async fn shutdown(State(state): State<AppState>) -> &'static str {
    tracing::info!("shutdown requested via API");
    state.shutdown.cancel();
    "shutting down"
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/status", get(status))
        .route("/shutdown", post(shutdown))
}
