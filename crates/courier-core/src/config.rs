//! Configuration system for Courier.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $COURIER_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/courier/config.toml
//!   3. ~/.config/courier/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub queue: QueueConfig,
    pub tasks: TaskSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address the HTTP API binds to.
    pub bind_addr: String,
    pub port: u16,
    /// Accepted `Host` header values. "*" accepts any host.
    pub allowed_hosts: Vec<String>,
    /// Verbose logging.
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file. ":memory:" keeps everything in process.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Pepper mixed into every password hash.
    pub secret_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Max concurrently executing tasks. 0 = available parallelism.
    pub workers: u32,
    /// Pending submissions the queue will buffer before rejecting.
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    /// Soft limit: the task is signalled and may clean up.
    pub soft_time_limit_secs: u64,
    /// Hard limit: the task is dropped.
    pub time_limit_secs: u64,
    /// Simulated processing latency for `process_data`.
    pub processing_delay_ms: u64,
    /// How long a finished task's status stays readable.
    pub result_ttl_secs: u64,
}

impl TaskSettings {
    pub fn soft_limit(&self) -> Duration {
        Duration::from_secs(self.soft_time_limit_secs)
    }

    pub fn hard_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }

    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8000,
            allowed_hosts: vec!["*".to_string()],
            debug: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("courier.db"),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            capacity: 1024,
        }
    }
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            soft_time_limit_secs: 25,
            time_limit_secs: 30,
            processing_delay_ms: 5000,
            result_ttl_secs: 86_400,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("courier")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("courier")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn parse_bool(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl CourierConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            CourierConfig::default()
        };
        config.apply_env_overrides();
        config.normalize()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("COURIER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&CourierConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply COURIER_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("COURIER_API__BIND_ADDR") {
            self.api.bind_addr = v;
        }
        if let Ok(v) = std::env::var("COURIER_API__PORT") {
            if let Ok(p) = v.parse() {
                self.api.port = p;
            }
        }
        if let Ok(v) = std::env::var("COURIER_API__ALLOWED_HOSTS") {
            self.api.allowed_hosts = v
                .split(',')
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect();
        }
        if let Ok(v) = std::env::var("COURIER_API__DEBUG") {
            self.api.debug = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("COURIER_DATABASE__PATH") {
            self.database.path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("COURIER_SECURITY__SECRET_KEY") {
            self.security.secret_key = v;
        }
        if let Ok(v) = std::env::var("COURIER_QUEUE__WORKERS") {
            if let Ok(n) = v.parse() {
                self.queue.workers = n;
            }
        }
        if let Ok(v) = std::env::var("COURIER_TASKS__SOFT_TIME_LIMIT_SECS") {
            if let Ok(n) = v.parse() {
                self.tasks.soft_time_limit_secs = n;
            }
        }
        if let Ok(v) = std::env::var("COURIER_TASKS__TIME_LIMIT_SECS") {
            if let Ok(n) = v.parse() {
                self.tasks.time_limit_secs = n;
            }
        }
        if let Ok(v) = std::env::var("COURIER_TASKS__PROCESSING_DELAY_MS") {
            if let Ok(n) = v.parse() {
                self.tasks.processing_delay_ms = n;
            }
        }
        if let Ok(v) = std::env::var("COURIER_TASKS__RESULT_TTL_SECS") {
            if let Ok(n) = v.parse() {
                self.tasks.result_ttl_secs = n;
            }
        }
    }

    /// Soft limit must stay strictly below the hard limit.
    fn normalize(&mut self) -> Result<(), ConfigError> {
        if self.tasks.time_limit_secs == 0 {
            return Err(ConfigError::Invalid(
                "tasks.time_limit_secs must be greater than zero".to_string(),
            ));
        }
        if self.tasks.soft_time_limit_secs >= self.tasks.time_limit_secs {
            self.tasks.soft_time_limit_secs = self.tasks.time_limit_secs - 1;
        }
        if self.api.allowed_hosts.is_empty() {
            self.api.allowed_hosts.push("*".to_string());
        }
        Ok(())
    }

    /// Effective worker count.
    pub fn worker_count(&self) -> usize {
        if self.queue.workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.queue.workers as usize
        }
    }
}
