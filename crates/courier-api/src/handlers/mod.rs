//! HTTP API handlers — accounts, processing submissions and task status.

pub mod accounts;
pub mod health;
pub mod tasks;

use std::sync::Arc;

use axum::body::Bytes;
use serde_json::{Map, Value};

use courier_core::FieldErrors;
use courier_services::{CredentialStore, TaskQueue};

use crate::error::ApiError;

#[derive(Clone)]
pub struct ApiState {
    pub credentials: CredentialStore,
    pub queue: TaskQueue,
    /// Hostnames accepted in the `Host` header. `*` accepts any.
    pub allowed_hosts: Arc<Vec<String>>,
}

impl ApiState {
    pub fn new(credentials: CredentialStore, queue: TaskQueue, allowed_hosts: Vec<String>) -> Self {
        Self {
            credentials,
            queue,
            allowed_hosts: Arc::new(allowed_hosts),
        }
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Parse a request body as a loose JSON object. An empty body is an empty
/// object so that every field reports as missing.
fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("JSON parse error - {e}")))?;
    if value.is_object() {
        return Ok(value);
    }
    Err(ApiError::Validation(FieldErrors::non_field(format!(
        "Invalid data. Expected a dictionary, but got {}.",
        json_kind(&value)
    ))))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// A string field from a raw body, for log lines written before validation.
fn field<'a>(body: &'a Value, name: &str) -> &'a str {
    body.get(name).and_then(Value::as_str).unwrap_or("")
}

// Re-export handler functions for use in router setup.
pub use accounts::{handle_login, handle_register};
pub use health::handle_health;
pub use tasks::{handle_process, handle_task_status};
