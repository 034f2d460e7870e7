//! /register and /login handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use courier_core::validation::{validate_login, validate_registration};
use courier_core::LoginResponse;

use super::{field, parse_body, ApiState};
use crate::error::ApiError;

// ── /register/ (POST) ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
}

pub async fn handle_register(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let body = parse_body(&body)?;

    let req = validate_registration(&body).inspect_err(|errors| {
        tracing::error!(
            username = field(&body, "username"),
            email = field(&body, "email"),
            %errors,
            "user registration failed"
        );
    })?;

    let user = state.credentials.register(&req).inspect_err(|e| {
        tracing::error!(username = %req.username, email = %req.email, error = %e, "user registration failed");
    })?;

    tracing::info!(user_id = user.id, username = %user.username, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
        }),
    ))
}

// ── /login/ (POST) ────────────────────────────────────────────────────────────

pub async fn handle_login(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<LoginResponse>, ApiError> {
    let body = parse_body(&body)?;
    let req = validate_login(&body)?;

    let login = state
        .credentials
        .authenticate(&req.username, &req.password)
        .inspect_err(|e| {
            tracing::warn!(username = %req.username, error = %e, "failed login attempt");
        })?;

    tracing::info!(user_id = login.user_id, username = %req.username, "user logged in");
    Ok(Json(login))
}
