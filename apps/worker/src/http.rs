// [apps/worker/src/http.rs]
//! Health/ready/status/metrics HTTP surface, per spec.md §6's worker
//! endpoint table.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use loadgen_models::Assignment;

use crate::state::WorkerState;

pub fn router(state: Arc<WorkerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Per spec.md §6: 200 when an assignment is present and at least one
/// synthesizer is loaded, 503 otherwise. Narrower than `/ready` — it does
/// not factor in connection-pool reconnect state.
async fn health(State(state): State<Arc<WorkerState>>) -> impl IntoResponse {
    if state.has_assignment() && state.synthesizer_count() > 0 {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "no assignment")
    }
}

/// Per spec.md §4.8's readiness bullet: healthy iff an assignment is
/// present, at least one synthesizer is loaded, and no endpoint has sat in
/// `Reconnecting` longer than the configured deadline.
async fn ready(State(state): State<Arc<WorkerState>>) -> impl IntoResponse {
    if state.is_ready() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

/// Field names match spec.md §6's literal `/status` JSON shape
/// (`{worker_id, has_assignment, synthesizers, buffer_size, assignment?,
/// timestamp}`) exactly, for clients parsing this endpoint by field name.
#[derive(Serialize)]
struct StatusBody {
    worker_id: String,
    has_assignment: bool,
    synthesizers: usize,
    buffer_size: usize,
    assignment: Option<Assignment>,
    timestamp: i64,
}

async fn status(State(state): State<Arc<WorkerState>>) -> impl IntoResponse {
    let body = StatusBody {
        worker_id: state.config.worker_id.clone(),
        has_assignment: state.has_assignment(),
        synthesizers: state.synthesizer_count(),
        buffer_size: state.total_buffer_len(),
        assignment: state.assignment.read().clone(),
        timestamp: crate::family_task::unix_now(),
    };
    Json(body)
}

async fn metrics(State(state): State<Arc<WorkerState>>) -> impl IntoResponse {
    state.metrics_handle.render()
}
