//! /health handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::ApiState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Tasks submitted but not yet finished.
    pub queued: usize,
    pub tasks: Vec<&'static str>,
    pub version: &'static str,
}

pub async fn handle_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        queued: state.queue.store().in_flight(),
        tasks: state.queue.registry().names(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
