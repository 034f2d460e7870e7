//! Shared data model — request payloads, persisted records, and task handles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Processing ────────────────────────────────────────────────────────────────

/// Validated `/process/` payload. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub email: String,
    pub message: String,
}

/// Output of one successful `process_data` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub id: Uuid,
    pub email: String,
    pub original_message: String,
    pub processed_message: String,
    pub created_at: DateTime<Utc>,
}

impl ProcessedRecord {
    /// A record with a fresh id, stamped now.
    pub fn new(email: &str, original_message: &str, processed_message: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            original_message: original_message.to_string(),
            processed_message: processed_message.to_string(),
            created_at: Utc::now(),
        }
    }
}

// ── Tasks ─────────────────────────────────────────────────────────────────────

/// Lifecycle state of a queued task, as reported by the status endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    /// Queued, or never seen by the queue.
    #[default]
    Pending,
    Started,
    Success,
    Failure,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Started => "STARTED",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status snapshot of a task, materialized from queue bookkeeping on demand.
///
/// `result` is `Some` exactly when `status` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
    pub status: TaskState,
    pub result: Option<String>,
}

impl TaskHandle {
    /// Handle for an id the queue knows nothing about.
    pub fn pending(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskState::Pending,
            result: None,
        }
    }
}

// ── Accounts ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
    pub email: String,
}
