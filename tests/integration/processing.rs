use std::time::Duration;

use serde_json::json;

use crate::*;

const WAIT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn test_process_end_to_end() {
    let node = Node::start().await.unwrap();
    let token = node.account("alice").await.unwrap();

    let task_id = node.process(&token, "a@b.com", "hello").await.unwrap();
    assert_eq!(task_id.len(), 36, "task id should be a UUID: {task_id}");

    let done = node.wait_terminal(&token, &task_id, WAIT).await.unwrap();
    assert_eq!(done["task_id"], task_id);
    assert_eq!(done["status"], "SUCCESS");
    assert_eq!(done["result"], "Data processed and saved successfully for email: a@b.com");

    let stored = node.records.list_for_email("a@b.com").unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].original_message, "hello");
    assert_eq!(stored[0].processed_message, "HELLO");
}

#[tokio::test]
async fn test_submission_does_not_wait_for_processing() {
    let node = Node::start_with(NodeOptions {
        settings: TaskSettings {
            soft_time_limit_secs: 25,
            time_limit_secs: 30,
            processing_delay_ms: 2_000,
            ..TaskSettings::default()
        },
        ..NodeOptions::default()
    })
    .await
    .unwrap();
    let token = node.account("alice").await.unwrap();

    let started = tokio::time::Instant::now();
    let task_id = node.process(&token, "a@b.com", "slow").await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    let (status, body) = node.get(&format!("/task-status/{task_id}/"), Some(&token)).await.unwrap();
    assert_eq!(status, 200);
    assert!(
        body["status"] == "PENDING" || body["status"] == "STARTED",
        "unexpected status: {body}"
    );
    assert!(body["result"].is_null());
}

#[tokio::test]
async fn test_duplicate_submissions_create_distinct_records() {
    let node = Node::start().await.unwrap();
    let token = node.account("alice").await.unwrap();

    let first = node.process(&token, "a@b.com", "same").await.unwrap();
    let second = node.process(&token, "a@b.com", "same").await.unwrap();
    assert_ne!(first, second);

    for id in [&first, &second] {
        let done = node.wait_terminal(&token, id, WAIT).await.unwrap();
        assert_eq!(done["status"], "SUCCESS");
    }

    let stored = node.records.list_for_email("a@b.com").unwrap();
    assert_eq!(stored.len(), 2);
    assert_ne!(stored[0].id, stored[1].id);
}

#[tokio::test]
async fn test_concurrent_submissions_all_complete() {
    let node = Node::start().await.unwrap();
    let token = node.account("alice").await.unwrap();

    let mut ids = Vec::new();
    for n in 0..10 {
        ids.push(node.process(&token, &format!("user{n}@example.com"), &format!("msg {n}")).await.unwrap());
    }
    for id in &ids {
        let done = node.wait_terminal(&token, id, WAIT).await.unwrap();
        assert_eq!(done["status"], "SUCCESS");
    }
    assert_eq!(node.records.count().unwrap(), 10);
    assert_eq!(node.records.list_for_email("user7@example.com").unwrap()[0].processed_message, "MSG 7");
}

#[tokio::test]
async fn test_invalid_payload_is_rejected_before_queueing() {
    let node = Node::start().await.unwrap();
    let token = node.account("alice").await.unwrap();

    let (status, body) = node
        .post("/process/", &json!({"email": "nope", "message": ""}), Some(&token))
        .await
        .unwrap();
    assert_eq!(status, 400);
    assert_eq!(body["email"][0], "Enter a valid email address.");
    assert_eq!(body["message"][0], "This field may not be blank.");

    let (status, body) = node
        .post("/process/", &json!({"email": "a@b.com", "message": "x".repeat(256)}), Some(&token))
        .await
        .unwrap();
    assert_eq!(status, 400);
    assert!(body["message"].is_array());

    assert_eq!(node.queue.store().len(), 0);
    assert_eq!(node.records.count().unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_task_id_reports_pending() {
    let node = Node::start().await.unwrap();
    let token = node.account("alice").await.unwrap();

    let (status, body) = node.get("/task-status/does-not-exist/", Some(&token)).await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(body, json!({"task_id": "does-not-exist", "status": "PENDING", "result": null}));
}

#[tokio::test]
async fn test_records_persist_across_restart() {
    let dir = tempfile::tempdir().unwrap();

    let token;
    {
        let node = Node::start_in(dir.path(), NodeOptions::default()).await.unwrap();
        token = node.account("alice").await.unwrap();
        let id = node.process(&token, "a@b.com", "keep me").await.unwrap();
        let done = node.wait_terminal(&token, &id, WAIT).await.unwrap();
        assert_eq!(done["status"], "SUCCESS");
    }

    let node = Node::start_in(dir.path(), NodeOptions::default()).await.unwrap();
    let stored = node.records.list_for_email("a@b.com").unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].processed_message, "KEEP ME");

    // Accounts and tokens persist too.
    let (status, _) = node.get("/task-status/x/", Some(&token)).await.unwrap();
    assert_eq!(status, 200);
}
