//! Task queue types — submissions, time limits, and failures.
//!
//! `TaskSubmit` is what travels through the queue. Arguments are kept as
//! `serde_json::Value`; each task deserializes its own.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A unit of work waiting for a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSubmit {
    /// UUIDv4, assigned at enqueue time.
    pub task_id: String,
    /// Registered task name, e.g. "process_data".
    pub name: String,
    /// Task-specific arguments.
    pub args: serde_json::Value,
}

/// Wall-clock ceilings for one task execution.
///
/// At `soft` the task is signalled through its `TaskContext` and may wrap up.
/// At `hard` the task is terminated unless it has already claimed its
/// `CommitGate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimits {
    pub soft: Duration,
    pub hard: Duration,
}

impl TimeLimits {
    pub fn new(soft: Duration, hard: Duration) -> Self {
        Self { soft, hard }
    }
}

/// Error returned by a task body. Its text becomes the task's result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TaskFailure(pub String);

impl TaskFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

const GATE_OPEN: u8 = 0;
const GATE_COMMITTED: u8 = 1;
const GATE_TERMINATED: u8 = 2;

/// Decides, once, whether a task's writes or its hard-limit termination win.
///
/// A task calls `try_commit` immediately before making its writes durable;
/// the worker calls `terminate` at the hard deadline. Whichever runs first
/// owns the outcome: a terminated task never commits, and a committed task is
/// allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CommitGate(Arc<AtomicU8>);

impl CommitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the caller may commit. Repeated commits are allowed.
    pub fn try_commit(&self) -> bool {
        match self
            .0
            .compare_exchange(GATE_OPEN, GATE_COMMITTED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(state) => state == GATE_COMMITTED,
        }
    }

    /// True if the task is now terminated, false if it already committed.
    pub fn terminate(&self) -> bool {
        match self
            .0
            .compare_exchange(GATE_OPEN, GATE_TERMINATED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(state) => state == GATE_TERMINATED,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.0.load(Ordering::Acquire) == GATE_TERMINATED
    }
}
