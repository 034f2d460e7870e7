//! Worker pool — drains the task queue and executes tasks under their time
//! limits.
//!
//! Each submission is marked STARTED, run with a soft-limit signal, and
//! terminated if it outlives its hard limit. The outcome is written back to the
//! `TaskStore`. Nothing is retried.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, watch, Semaphore};

use crate::task_queue::{Task, TaskContext, TaskReceiver, TaskRegistry};
use crate::task_store::TaskStore;
use crate::task_types::{CommitGate, TaskFailure, TaskSubmit};
use courier_core::TaskState;

/// Runs until the queue closes or `shutdown` fires, then waits for in-flight
/// tasks to finish.
pub async fn run(
    mut rx: TaskReceiver,
    registry: Arc<TaskRegistry>,
    store: TaskStore,
    max_tasks: usize,
    mut shutdown: broadcast::Receiver<()>,
) {
    let max_tasks = max_tasks.max(1);
    let semaphore = Arc::new(Semaphore::new(max_tasks));

    tracing::info!(max_concurrent = max_tasks, "worker pool started");

    loop {
        let submit = tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("worker pool stopping");
                break;
            }
            next = rx.recv() => match next {
                Some(submit) => submit,
                None => break,
            },
        };

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => break, // semaphore closed
        };

        let registry = registry.clone();
        let store = store.clone();
        tokio::spawn(async move {
            execute(&registry, &store, submit).await;
            drop(permit);
        });
    }

    // Drain: every permit back means every spawned task has finished.
    let _ = semaphore.acquire_many(max_tasks as u32).await;
    tracing::info!("worker pool stopped");
}

/// Execute one submission and record its outcome.
pub async fn execute(registry: &TaskRegistry, store: &TaskStore, submit: TaskSubmit) {
    let task_id = submit.task_id.clone();

    let Some(task) = registry.get(&submit.name) else {
        tracing::error!(task_id = %task_id, task = %submit.name, "no such task registered");
        store.complete(
            &task_id,
            TaskState::Failure,
            format!("NotRegistered({:?})", submit.name),
            0,
        );
        return;
    };

    store.mark_started(&task_id);
    tracing::info!(task_id = %task_id, task = task.name(), "task started");

    let start = Instant::now();
    let outcome = run_with_limits(task, task_id.clone(), submit.args).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let (state, result) = match outcome {
        Ok(text) => (TaskState::Success, text),
        Err(failure) => (TaskState::Failure, failure.0),
    };
    store.complete(&task_id, state, result, elapsed_ms);

    tracing::info!(task_id = %task_id, %state, elapsed_ms, "task finished");
}

/// Run `task` on its own tokio task, firing the soft-limit signal at the soft
/// deadline and terminating it at the hard deadline.
///
/// Termination goes through the task's `CommitGate`: a task that has already
/// claimed the gate is allowed to finish; otherwise the gate is closed, so any
/// write still in flight (e.g. on a blocking thread) is rolled back, and the
/// body is aborted.
async fn run_with_limits(
    task: Arc<dyn Task>,
    task_id: String,
    args: serde_json::Value,
) -> Result<String, TaskFailure> {
    let limits = task.time_limits();
    let (soft_tx, soft_rx) = watch::channel(false);
    let gate = CommitGate::new();
    let ctx = TaskContext::new(task_id.clone(), soft_rx, gate.clone());

    let mut body = {
        let task = task.clone();
        tokio::spawn(async move { task.run(ctx, args).await })
    };

    let soft_deadline = tokio::time::sleep(limits.soft);
    let hard_deadline = tokio::time::sleep(limits.hard);
    tokio::pin!(soft_deadline);
    tokio::pin!(hard_deadline);
    let mut soft_fired = false;
    let mut hard_armed = true;

    loop {
        tokio::select! {
            // Hard deadline takes precedence over a late completion.
            biased;

            _ = &mut hard_deadline, if hard_armed => {
                if gate.terminate() {
                    body.abort();
                    tracing::error!(
                        task_id = %task_id,
                        hard_limit_secs = limits.hard.as_secs(),
                        "hard time limit exceeded, task terminated"
                    );
                    return Err(TaskFailure::new(format!(
                        "TimeLimitExceeded({}s)",
                        limits.hard.as_secs()
                    )));
                }
                hard_armed = false;
                tracing::warn!(
                    task_id = %task_id,
                    hard_limit_secs = limits.hard.as_secs(),
                    "hard time limit reached while committing, letting task finish"
                );
            }
            joined = &mut body => {
                return match joined {
                    Ok(outcome) => outcome,
                    Err(e) if e.is_panic() => {
                        tracing::error!(task_id = %task_id, "task panicked");
                        Err(TaskFailure::new("task panicked"))
                    }
                    Err(_) => Err(TaskFailure::new("task cancelled")),
                };
            }
            _ = &mut soft_deadline, if !soft_fired => {
                soft_fired = true;
                tracing::warn!(
                    task_id = %task_id,
                    soft_limit_secs = limits.soft.as_secs(),
                    "soft time limit exceeded"
                );
                let _ = soft_tx.send(true);
            }
        }
    }
}
