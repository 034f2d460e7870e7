//! Daemon health command.

use anyhow::Result;
use serde::Deserialize;

use super::http::Endpoint;

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
    queued: usize,
    tasks: Vec<String>,
    version: String,
}

pub async fn cmd_health(ep: &Endpoint) -> Result<()> {
    let resp: HealthResponse = ep.get_json("health/", false).await?;

    println!("═══════════════════════════════════════");
    println!("  Courier Daemon Health");
    println!("═══════════════════════════════════════");
    println!("  Status  : {}", resp.status);
    println!("  Version : {}", resp.version);
    println!("  Queued  : {}", resp.queued);
    println!("  Tasks   : {}", resp.tasks.join(", "));
    Ok(())
}
