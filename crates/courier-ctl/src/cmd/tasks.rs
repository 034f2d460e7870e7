//! Processing submission and task status commands.

use std::future::Future;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use super::http::Endpoint;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Serialize)]
struct ProcessRequest<'a> {
    email: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct ProcessResponse {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct TaskStatus {
    task_id: String,
    status: String,
    result: Option<String>,
}

impl TaskStatus {
    fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "SUCCESS" | "FAILURE")
    }
}

pub async fn cmd_process(ep: &Endpoint, email: &str, message: &str) -> Result<()> {
    let body = ProcessRequest { email, message };
    let resp: ProcessResponse = ep.post_json_body("process/", &body, true).await?;
    println!("Queued task {}", resp.task_id);
    Ok(())
}

pub async fn cmd_status(ep: &Endpoint, task_id: &str) -> Result<()> {
    let status = fetch(ep, task_id).await?;
    print_status(&status);
    Ok(())
}

/// Poll until the task reaches SUCCESS or FAILURE, giving up after `timeout`.
pub async fn cmd_wait(ep: &Endpoint, task_id: &str, timeout: Duration) -> Result<()> {
    let status =
        poll_until_terminal(task_id, timeout, POLL_INTERVAL, move || fetch(ep, task_id)).await?;
    print_status(&status);
    if status.status == "FAILURE" {
        std::process::exit(1);
    }
    Ok(())
}

async fn poll_until_terminal<F, Fut>(
    task_id: &str,
    timeout: Duration,
    interval: Duration,
    mut fetch: F,
) -> Result<TaskStatus>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<TaskStatus>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let mut last = String::new();
    loop {
        let status = fetch().await?;
        if status.is_terminal() {
            return Ok(status);
        }
        if status.status != last {
            println!("{} ...", status.status);
            last = status.status;
        }
        if tokio::time::Instant::now() + interval > deadline {
            bail!(
                "task {} still {} after {}s (unknown or expired task ids stay PENDING)",
                task_id,
                last,
                timeout.as_secs()
            );
        }
        tokio::time::sleep(interval).await;
    }
}

async fn fetch(ep: &Endpoint, task_id: &str) -> Result<TaskStatus> {
    ep.get_json(&format!("task-status/{}/", task_id), true).await
}

fn print_status(s: &TaskStatus) {
    println!("  ┌─ {}", s.task_id);
    println!("  │  status : {}", s.status);
    println!("  └─ result : {}", s.result.as_deref().unwrap_or("-"));
}
