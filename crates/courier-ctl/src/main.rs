//! courier-ctl — command-line interface for the Courier daemon.

mod cmd;

use std::time::Duration;

use anyhow::{Context, Result};

use cmd::http::Endpoint;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 120;

fn print_usage() {
    println!(
        "Usage: courier-ctl [--host <host>] [--port <port>] [--token <token>] [--timeout <secs>] <command>"
    );
    println!();
    println!("Commands:");
    println!("  register <username> <email> <password>   Create an account");
    println!("  login <username> <password>              Obtain an API token");
    println!("  process <email> <message>                Queue a message for processing");
    println!("  status <task_id>                         Show a task's status");
    println!("  wait <task_id>                           Poll until a task finishes");
    println!("  health                                   Show daemon health");
    println!();
    println!("Options:");
    println!("  --host <host>     API host (default: {})", DEFAULT_HOST);
    println!("  --port <port>     API port (default: {})", DEFAULT_PORT);
    println!("  --token <token>   API token (default: $COURIER_TOKEN)");
    println!(
        "  --timeout <secs>  How long `wait` polls before giving up (default: {})",
        DEFAULT_WAIT_TIMEOUT_SECS
    );
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut port = DEFAULT_PORT;
    let mut host = DEFAULT_HOST.to_string();
    let mut token = std::env::var("COURIER_TOKEN").ok().filter(|t| !t.is_empty());
    let mut wait_timeout = Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS);
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                port = args
                    .get(i)
                    .context("--port requires a value")?
                    .parse()
                    .context("--port must be a number")?;
            }
            "--host" => {
                i += 1;
                host = args.get(i).context("--host requires a value")?.clone();
            }
            "--timeout" => {
                i += 1;
                let secs: u64 = args
                    .get(i)
                    .context("--timeout requires a value")?
                    .parse()
                    .context("--timeout must be a number of seconds")?;
                wait_timeout = Duration::from_secs(secs);
            }
            "--token" => {
                i += 1;
                token = Some(args.get(i).context("--token requires a value")?.clone());
            }
            other => remaining.push(other),
        }
        i += 1;
    }

    let ep = Endpoint::new(&host, port, token);

    match remaining.as_slice() {
        ["register", username, email, password] => {
            cmd::account::cmd_register(&ep, username, email, password).await
        }
        ["login", username, password]      => cmd::account::cmd_login(&ep, username, password).await,
        ["process", email, message]        => cmd::tasks::cmd_process(&ep, email, message).await,
        ["status", task_id]                => cmd::tasks::cmd_status(&ep, task_id).await,
        ["wait", task_id]                  => cmd::tasks::cmd_wait(&ep, task_id, wait_timeout).await,
        ["health"] | []                    => cmd::health::cmd_health(&ep).await,
        ["help"] | ["--help"] | ["-h"]     => { print_usage(); Ok(()) }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
