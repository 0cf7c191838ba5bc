// [apps/monitor/src/http.rs]
//! HTTP surface per spec.md §6: `/metrics`, `/status`, `/families`,
//! `POST /compute`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use loadgen_models::DivergenceScore;

use crate::state::MonitorState;

pub fn router(state: Arc<MonitorState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/families", get(families))
        .route("/metrics", get(metrics))
        .route("/compute", post(compute))
        .with_state(state)
}

#[derive(Serialize)]
struct StatusBody {
    tracked_families: usize,
    uptime_seconds: u64,
}

async fn status(State(state): State<Arc<MonitorState>>) -> impl IntoResponse {
    Json(StatusBody {
        tracked_families: state.families.read().len(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

async fn families(State(state): State<Arc<MonitorState>>) -> impl IntoResponse {
    let scores: Vec<DivergenceScore> = state.divergence_scores.read().values().cloned().collect();
    Json(scores)
}

async fn metrics(State(state): State<Arc<MonitorState>>) -> impl IntoResponse {
    state.metrics_handle.render()
}

/// Triggers an out-of-band compute pass and returns immediately; the
/// result lands in `/families` once the pass completes.
async fn compute(State(state): State<Arc<MonitorState>>) -> impl IntoResponse {
    tokio::spawn(async move {
        crate::divergence_tick::tick_now(&state).await;
    });
    StatusCode::ACCEPTED
}
