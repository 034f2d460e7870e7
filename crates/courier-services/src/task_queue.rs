//! Task queue client — registers named tasks, accepts submissions, and
//! answers status lookups.
//!
//! The queue is an ordinary value built at startup and handed to whoever
//! needs it. Submissions go onto a bounded channel that `worker::run`
//! drains; bookkeeping lives in the shared `TaskStore`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::task_store::TaskStore;
use crate::task_types::{CommitGate, TaskFailure, TaskSubmit, TimeLimits};
use courier_core::TaskHandle;

/// A named unit of work executed by the worker pool.
#[async_trait]
pub trait Task: Send + Sync {
    /// Name used at enqueue time.
    fn name(&self) -> &'static str;

    /// Soft and hard execution ceilings.
    fn time_limits(&self) -> TimeLimits;

    /// Execute once. `Ok` text is stored as a SUCCESS result, `Err` text as
    /// a FAILURE result.
    async fn run(&self, ctx: TaskContext, args: serde_json::Value) -> Result<String, TaskFailure>;
}

/// Per-execution handle given to a running task.
pub struct TaskContext {
    task_id: String,
    soft_limit: watch::Receiver<bool>,
    gate: CommitGate,
}

impl TaskContext {
    pub fn new(task_id: String, soft_limit: watch::Receiver<bool>, gate: CommitGate) -> Self {
        Self {
            task_id,
            soft_limit,
            gate,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Claim this before making results durable. Refused once the hard limit
    /// has terminated the task.
    pub fn gate(&self) -> &CommitGate {
        &self.gate
    }

    /// True once the soft time limit has passed.
    pub fn soft_limit_exceeded(&self) -> bool {
        *self.soft_limit.borrow()
    }

    /// Resolves when the soft time limit passes. Never resolves if the task
    /// finishes first.
    pub async fn soft_limit_reached(&mut self) {
        while !*self.soft_limit.borrow_and_update() {
            if self.soft_limit.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Name → task lookup shared by the queue client and the workers.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: HashMap<&'static str, Arc<dyn Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: Arc<dyn Task>) {
        tracing::debug!(task = task.name(), "task registered");
        self.tasks.insert(task.name(), task);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.tasks.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("no task registered under name {0:?}")]
    UnknownTask(String),
    #[error("task queue is full")]
    Full,
    #[error("task queue is closed")]
    Closed,
}

/// Receiving half of the queue, consumed by `worker::run`.
pub type TaskReceiver = mpsc::Receiver<TaskSubmit>;

/// Client handle for submitting tasks and reading their status.
#[derive(Clone)]
pub struct TaskQueue {
    registry: Arc<TaskRegistry>,
    store: TaskStore,
    tx: mpsc::Sender<TaskSubmit>,
}

impl TaskQueue {
    pub fn new(registry: Arc<TaskRegistry>, store: TaskStore, capacity: usize) -> (Self, TaskReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                registry,
                store,
                tx,
            },
            rx,
        )
    }

    /// Queue `name` with `args` and return its id without waiting for it to
    /// run.
    pub fn enqueue(&self, name: &str, args: serde_json::Value) -> Result<String, QueueError> {
        if self.registry.get(name).is_none() {
            return Err(QueueError::UnknownTask(name.to_string()));
        }

        let task_id = uuid::Uuid::new_v4().to_string();
        let submit = TaskSubmit {
            task_id: task_id.clone(),
            name: name.to_string(),
            args,
        };

        // Track before sending so a fast worker always finds the entry.
        self.store.submit(submit.clone());
        if let Err(e) = self.tx.try_send(submit) {
            self.store.remove(&task_id);
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => QueueError::Full,
                mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
            });
        }

        tracing::debug!(task_id = %task_id, task = name, "task enqueued");
        Ok(task_id)
    }

    /// Current status of `task_id`. Unknown ids are PENDING.
    pub fn status(&self, task_id: &str) -> TaskHandle {
        self.store.handle(task_id)
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }
}
