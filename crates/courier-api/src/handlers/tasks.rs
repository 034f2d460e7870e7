//! /process and /task-status handlers.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use courier_core::validation::validate_process;
use courier_core::{TaskHandle, User};
use courier_services::process_task;

use super::{field, parse_body, ApiState};
use crate::error::ApiError;

// ── /process/ (POST) ──────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ProcessResponse {
    pub task_id: String,
}

pub async fn handle_process(
    State(state): State<ApiState>,
    Extension(user): Extension<User>,
    body: Bytes,
) -> Result<(StatusCode, Json<ProcessResponse>), ApiError> {
    let body = parse_body(&body)?;

    tracing::info!(
        user = %user.username,
        email = field(&body, "email"),
        "processing request received"
    );

    let req = validate_process(&body).inspect_err(|errors| {
        tracing::error!(user = %user.username, %errors, "invalid processing request");
    })?;

    let task_id = process_task::submit(&state.queue, &req).inspect_err(|e| {
        tracing::error!(user = %user.username, email = %req.email, error = %e, "could not queue processing task");
    })?;

    tracing::info!(user = %user.username, email = %req.email, task_id = %task_id, "processing task created");
    Ok((StatusCode::ACCEPTED, Json(ProcessResponse { task_id })))
}

// ── /task-status/{task_id}/ (GET) ─────────────────────────────────────────────

pub async fn handle_task_status(
    State(state): State<ApiState>,
    Extension(user): Extension<User>,
    Path(task_id): Path<String>,
) -> Json<TaskHandle> {
    let handle = state.queue.status(&task_id);
    tracing::info!(
        user = %user.username,
        task_id = %task_id,
        status = %handle.status,
        "task status checked"
    );
    Json(handle)
}
