//! Courier integration test harness.
//!
//! Each test starts its own in-process daemon (stores, queue, worker pool and
//! HTTP API) on an ephemeral localhost port and talks to it over real TCP.

mod accounts;
mod limits;
mod processing;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use courier_api::ApiState;
use courier_core::config::TaskSettings;
use courier_services::{
    worker, CredentialStore, ProcessDataTask, RecordStore, Task, TaskQueue, TaskRegistry, TaskStore,
};

pub const PASSWORD: &str = "correct-horse-battery";

// ── Harness ───────────────────────────────────────────────────────────────────

pub struct NodeOptions {
    pub settings: TaskSettings,
    pub workers: usize,
    pub allowed_hosts: Vec<String>,
    pub extra_tasks: Vec<Arc<dyn Task>>,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            settings: TaskSettings {
                soft_time_limit_secs: 25,
                time_limit_secs: 30,
                processing_delay_ms: 50,
                ..TaskSettings::default()
            },
            workers: 4,
            allowed_hosts: vec!["*".to_string()],
            extra_tasks: Vec::new(),
        }
    }
}

/// A running daemon. Dropping it stops the worker pool.
pub struct Node {
    pub base: String,
    pub records: RecordStore,
    pub queue: TaskQueue,
    client: reqwest::Client,
    _shutdown: broadcast::Sender<()>,
}

impl Node {
    pub async fn start() -> Result<Self> {
        Self::start_with(NodeOptions::default()).await
    }

    pub async fn start_with(opts: NodeOptions) -> Result<Self> {
        let records = RecordStore::in_memory()?;
        let credentials = CredentialStore::in_memory("integration-secret")?;
        Self::start_on(records, credentials, opts).await
    }

    /// Start against SQLite files under `dir`.
    pub async fn start_in(dir: &Path, opts: NodeOptions) -> Result<Self> {
        let db = dir.join("courier.db");
        let records = RecordStore::open(&db)?;
        let credentials = CredentialStore::open(&db, "integration-secret")?;
        Self::start_on(records, credentials, opts).await
    }

    async fn start_on(records: RecordStore, credentials: CredentialStore, opts: NodeOptions) -> Result<Self> {
        let mut registry = TaskRegistry::new();
        registry.register(Arc::new(ProcessDataTask::new(records.clone(), &opts.settings)));
        for task in opts.extra_tasks {
            registry.register(task);
        }
        let registry = Arc::new(registry);
        let store = TaskStore::new();
        let (queue, rx) = TaskQueue::new(registry.clone(), store.clone(), 64);

        let (shutdown_tx, _) = broadcast::channel(1);
        tokio::spawn(worker::run(rx, registry, store, opts.workers, shutdown_tx.subscribe()));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let state = ApiState::new(credentials, queue.clone(), opts.allowed_hosts);
        tokio::spawn(courier_api::serve_on(listener, state));

        Ok(Self {
            base: format!("http://127.0.0.1:{port}/api"),
            records,
            queue,
            client: reqwest::Client::new(),
            _shutdown: shutdown_tx,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// GET, returning status code and JSON body.
    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<(u16, Value)> {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        read(req.send().await.context("GET failed")?).await
    }

    /// POST a JSON body, returning status code and JSON body.
    pub async fn post(&self, path: &str, body: &Value, token: Option<&str>) -> Result<(u16, Value)> {
        let mut req = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        read(req.send().await.context("POST failed")?).await
    }

    /// Register `username` and log in, returning the token.
    pub async fn account(&self, username: &str) -> Result<String> {
        let email = format!("{username}@example.com");
        let (status, body) = self
            .post(
                "/register/",
                &json!({"username": username, "email": email, "password": PASSWORD}),
                None,
            )
            .await?;
        if status != 201 {
            bail!("register failed: {status} {body}");
        }
        let (status, body) = self
            .post("/login/", &json!({"username": username, "password": PASSWORD}), None)
            .await?;
        if status != 200 {
            bail!("login failed: {status} {body}");
        }
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("login response missing token")
    }

    /// Submit a processing request and return the task id.
    pub async fn process(&self, token: &str, email: &str, message: &str) -> Result<String> {
        let (status, body) = self
            .post("/process/", &json!({"email": email, "message": message}), Some(token))
            .await?;
        if status != 202 {
            bail!("process failed: {status} {body}");
        }
        body["task_id"]
            .as_str()
            .map(str::to_string)
            .context("process response missing task_id")
    }

    /// Poll task status until it is SUCCESS or FAILURE.
    pub async fn wait_terminal(&self, token: &str, task_id: &str, timeout: Duration) -> Result<Value> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let (status, body) = self.get(&format!("/task-status/{task_id}/"), Some(token)).await?;
            if status != 200 {
                bail!("status check failed: {status} {body}");
            }
            if body["status"] == "SUCCESS" || body["status"] == "FAILURE" {
                return Ok(body);
            }
            if tokio::time::Instant::now() >= deadline {
                bail!("task {task_id} still {} after {timeout:?}", body["status"]);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

async fn read(resp: reqwest::Response) -> Result<(u16, Value)> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).with_context(|| format!("non-JSON body: {text}"))?
    };
    Ok((status, body))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    let node = Node::start().await.unwrap();
    let (status, body) = node.get("/health/", None).await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["queued"], 0);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let node = Node::start().await.unwrap();
    let (status, _) = node.get("/nope/", None).await.unwrap();
    assert_eq!(status, 404);
}
