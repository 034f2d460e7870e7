//! `process_data` — uppercase a message, simulate work, and store the result.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use courier_core::config::TaskSettings;
use courier_core::ProcessRequest;

use crate::record_store::{RecordStore, StoreError};
use crate::task_queue::{QueueError, Task, TaskContext, TaskQueue};
use crate::task_types::{TaskFailure, TimeLimits};

pub const PROCESS_DATA: &str = "process_data";

#[derive(Deserialize)]
struct ProcessArgs {
    email: String,
    message: String,
}

pub struct ProcessDataTask {
    records: RecordStore,
    delay: Duration,
    limits: TimeLimits,
}

impl ProcessDataTask {
    pub fn new(records: RecordStore, settings: &TaskSettings) -> Self {
        Self {
            records,
            delay: settings.processing_delay(),
            limits: TimeLimits::new(settings.soft_limit(), settings.hard_limit()),
        }
    }
}

/// The transformation applied to every message.
pub fn transform(message: &str) -> String {
    message.to_uppercase()
}

/// Queue a validated request for processing.
pub fn submit(queue: &TaskQueue, req: &ProcessRequest) -> Result<String, QueueError> {
    queue.enqueue(
        PROCESS_DATA,
        serde_json::json!({ "email": req.email, "message": req.message }),
    )
}

#[async_trait]
impl Task for ProcessDataTask {
    fn name(&self) -> &'static str {
        PROCESS_DATA
    }

    fn time_limits(&self) -> TimeLimits {
        self.limits
    }

    async fn run(&self, mut ctx: TaskContext, args: serde_json::Value) -> Result<String, TaskFailure> {
        let task_id = ctx.task_id().to_string();
        let args: ProcessArgs = match serde_json::from_value(args.clone()) {
            Ok(a) => a,
            Err(e) => {
                let email = args.get("email").and_then(|v| v.as_str()).unwrap_or("<unknown>");
                tracing::error!(task_id = %task_id, email, error = %e, "invalid task arguments");
                return Err(TaskFailure::new(format!(
                    "Error processing data for email: {email}. Error: {e}"
                )));
            }
        };
        let email = args.email.as_str();

        tracing::info!(
            task_id = %task_id,
            email,
            message = %args.message,
            "starting task to process data"
        );

        let processed = transform(&args.message);

        tokio::select! {
            _ = tokio::time::sleep(self.delay) => {}
            _ = ctx.soft_limit_reached() => {
                tracing::warn!(task_id = %task_id, email, "soft time limit reached, saving early");
            }
        }

        let stored = {
            let records = self.records.clone();
            let gate = ctx.gate().clone();
            let (email, message) = (args.email.clone(), args.message.clone());
            tokio::task::spawn_blocking(move || {
                records.insert_gated(&email, &message, &processed, &gate)
            })
            .await
        };

        match stored {
            Ok(Ok(record)) => {
                tracing::info!(
                    task_id = %task_id,
                    email,
                    record_id = %record.id,
                    "processed data stored"
                );
                Ok(format!("Data processed and saved successfully for email: {email}"))
            }
            Ok(Err(StoreError::Integrity(e))) => {
                tracing::error!(task_id = %task_id, email, error = %e, "database error while processing data");
                Err(TaskFailure::new(format!(
                    "Database error while processing data for email: {email}. Error: {e}"
                )))
            }
            Ok(Err(StoreError::Terminated)) => {
                tracing::warn!(task_id = %task_id, email, "task terminated before commit, record discarded");
                Err(TaskFailure::new(format!(
                    "Error processing data for email: {email}. Error: {}",
                    StoreError::Terminated
                )))
            }
            Ok(Err(e)) => {
                tracing::error!(task_id = %task_id, email, error = %e, "error processing data");
                Err(TaskFailure::new(format!(
                    "Error processing data for email: {email}. Error: {e}"
                )))
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, email, error = %e, "storage worker failed");
                Err(TaskFailure::new(format!(
                    "Error processing data for email: {email}. Error: {e}"
                )))
            }
        }
    }
}
