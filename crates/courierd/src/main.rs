//! courierd — message processing daemon.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use courier_api::ApiState;
use courier_core::config::CourierConfig;
use courier_services::{
    task_store, worker, CredentialStore, ProcessDataTask, RecordStore, TaskQueue, TaskRegistry,
    TaskStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Config comes first so `api.debug` can pick the default log level.
    let written = CourierConfig::write_default_if_missing();
    let loaded = CourierConfig::load();
    let debug = loaded.as_ref().map(|c| c.api.debug).unwrap_or(false);

    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = written {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        CourierConfig::default()
    });
    tracing::info!(
        config = %CourierConfig::file_path().display(),
        database = %config.database.path.display(),
        "courierd starting"
    );
    if config.security.secret_key.is_empty() {
        tracing::warn!("security.secret_key is empty; password hashes are unpeppered");
    }

    // ── Storage ──────────────────────────────────────────────────────────────
    let records = RecordStore::open(&config.database.path)
        .with_context(|| format!("failed to open {}", config.database.path.display()))?;
    let credentials = CredentialStore::open(&config.database.path, &config.security.secret_key)
        .with_context(|| format!("failed to open {}", config.database.path.display()))?;

    // ── Task queue ───────────────────────────────────────────────────────────
    let mut registry = TaskRegistry::new();
    registry.register(Arc::new(ProcessDataTask::new(records, &config.tasks)));
    let registry = Arc::new(registry);
    let store = TaskStore::new();
    let (queue, rx) = TaskQueue::new(registry.clone(), store.clone(), config.queue.capacity);

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────
    tokio::spawn(task_store::sweep(
        store.clone(),
        config.tasks.result_ttl(),
        shutdown_tx.subscribe(),
    ));

    let worker_task = tokio::spawn(worker::run(
        rx,
        registry,
        store,
        config.worker_count(),
        shutdown_tx.subscribe(),
    ));

    let state = ApiState::new(credentials, queue, config.api.allowed_hosts.clone());
    let bind_addr = config.api.bind_addr.clone();
    let port = config.api.port;
    let mut api_task =
        tokio::spawn(async move { courier_api::serve(state, &bind_addr, port).await });

    // ── Wait for exit ────────────────────────────────────────────────────────
    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = &mut api_task => match r {
            Ok(Ok(())) => tracing::error!("API server exited"),
            Ok(Err(e)) => tracing::error!(error = %e, "API server failed"),
            Err(e) => tracing::error!(error = %e, "API task panicked"),
        },
    }

    // Let running tasks finish before exiting.
    let _ = shutdown_tx.send(());
    api_task.abort();
    if let Err(e) = worker_task.await {
        tracing::error!(error = %e, "worker pool panicked");
    }

    Ok(())
}
