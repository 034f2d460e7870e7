use crate::task_types::TaskSubmit;
use courier_core::{TaskHandle, TaskState};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

/// Full bookkeeping state of a queued task.
#[derive(Debug, Clone)]
pub struct TaskEntry {
    /// Original submission.
    pub submit: TaskSubmit,
    /// Current state.
    pub state: TaskState,
    /// Result text, populated once the task reaches a terminal state.
    pub result: Option<String>,
    /// Unix ms when the task was enqueued.
    pub submitted_at: u64,
    /// Unix ms when the state last changed.
    pub updated_at: u64,
    /// Wall-clock execution time, once finished.
    pub elapsed_ms: Option<u64>,
}

impl TaskEntry {
    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            task_id: self.submit.task_id.clone(),
            status: self.state,
            result: self.result.clone(),
        }
    }
}

/// In-memory results backend for the task queue.
#[derive(Clone, Default)]
pub struct TaskStore {
    /// task_id → TaskEntry
    tasks: Arc<DashMap<String, TaskEntry>>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(DashMap::new()),
        }
    }

    /// Record a new submission as PENDING. Duplicate `task_id`s are ignored.
    pub fn submit(&self, submit: TaskSubmit) {
        let task_id = submit.task_id.clone();
        self.tasks.entry(task_id).or_insert_with(|| {
            let now = now_ms();
            TaskEntry {
                submit,
                state: TaskState::Pending,
                result: None,
                submitted_at: now,
                updated_at: now,
                elapsed_ms: None,
            }
        });
    }

    /// Forget a submission that never made it onto the queue.
    pub fn remove(&self, task_id: &str) {
        self.tasks.remove(task_id);
    }

    /// A worker picked the task up.
    pub fn mark_started(&self, task_id: &str) {
        if let Some(mut task) = self.tasks.get_mut(task_id) {
            if !task.state.is_terminal() {
                task.state = TaskState::Started;
                task.updated_at = now_ms();
            }
        }
    }

    /// Store the final state and result. Non-terminal states are ignored so a
    /// result is never attached to a running task.
    pub fn complete(&self, task_id: &str, state: TaskState, result: String, elapsed_ms: u64) {
        if !state.is_terminal() {
            tracing::warn!(task_id, %state, "refusing to complete task with non-terminal state");
            return;
        }
        if let Some(mut task) = self.tasks.get_mut(task_id) {
            task.state = state;
            task.result = Some(result);
            task.elapsed_ms = Some(elapsed_ms);
            task.updated_at = now_ms();
        }
    }

    /// Look up a task by id.
    pub fn get(&self, task_id: &str) -> Option<TaskEntry> {
        self.tasks.get(task_id).map(|t| t.clone())
    }

    /// Status snapshot. Unknown ids report PENDING with no result.
    pub fn handle(&self, task_id: &str) -> TaskHandle {
        self.tasks
            .get(task_id)
            .map(|t| t.handle())
            .unwrap_or_else(|| TaskHandle::pending(task_id))
    }

    /// Drop terminal entries last updated at or before `cutoff_ms`.
    /// Returns the number removed.
    pub fn prune_finished_before(&self, cutoff_ms: u64) -> usize {
        let mut removed = 0;
        self.tasks.retain(|_, task| {
            let expired = task.state.is_terminal() && task.updated_at <= cutoff_ms;
            if expired {
                removed += 1;
            }
            !expired
        });
        removed
    }

    /// Drop terminal entries that finished more than `ttl` ago.
    pub fn prune_expired(&self, ttl: Duration) -> usize {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self.prune_finished_before(now_ms().saturating_sub(ttl_ms))
    }

    /// Tasks not yet in a terminal state.
    pub fn in_flight(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| !t.value().state.is_terminal())
            .count()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

fn sweep_interval(ttl: Duration) -> Duration {
    (ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60))
}

/// Evict expired results from `store` on a fixed tick until shutdown.
pub async fn sweep(store: TaskStore, ttl: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(sweep_interval(ttl));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!(ttl_secs = ttl.as_secs(), "task result sweeper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = store.prune_expired(ttl);
                if removed > 0 {
                    tracing::debug!(removed, remaining = store.len(), "evicted expired task results");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
