use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_services::{TaskContext, TaskFailure, TimeLimits};

use crate::*;

/// Sleeps far past its hard limit and ignores the soft-limit signal.
struct Stubborn;

#[async_trait]
impl Task for Stubborn {
    fn name(&self) -> &'static str {
        "stubborn"
    }

    fn time_limits(&self) -> TimeLimits {
        TimeLimits::new(Duration::from_millis(100), Duration::from_secs(1))
    }

    async fn run(&self, _ctx: TaskContext, _args: Value) -> Result<String, TaskFailure> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("finished".to_string())
    }
}

#[tokio::test]
async fn test_hard_limit_fails_the_task() {
    let node = Node::start_with(NodeOptions {
        extra_tasks: vec![Arc::new(Stubborn)],
        ..NodeOptions::default()
    })
    .await
    .unwrap();
    let token = node.account("alice").await.unwrap();

    let task_id = node.queue.enqueue("stubborn", json!({})).unwrap();
    let done = node.wait_terminal(&token, &task_id, Duration::from_secs(10)).await.unwrap();
    assert_eq!(done["status"], "FAILURE");
    assert_eq!(done["result"], "TimeLimitExceeded(1s)");
}

#[tokio::test]
async fn test_soft_limit_saves_early() {
    // A zero soft limit fires long before the 30s processing delay.
    let node = Node::start_with(NodeOptions {
        settings: TaskSettings {
            soft_time_limit_secs: 0,
            time_limit_secs: 5,
            processing_delay_ms: 30_000,
            ..TaskSettings::default()
        },
        ..NodeOptions::default()
    })
    .await
    .unwrap();
    let token = node.account("alice").await.unwrap();

    let task_id = node.process(&token, "a@b.com", "hurry").await.unwrap();
    let done = node.wait_terminal(&token, &task_id, Duration::from_secs(4)).await.unwrap();
    assert_eq!(done["status"], "SUCCESS");
    assert_eq!(node.records.list_for_email("a@b.com").unwrap()[0].processed_message, "HURRY");
}
