//! Shared SQLite connection setup.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, ErrorCode};

pub const IN_MEMORY: &str = ":memory:";

/// Open (or create) a database, making the parent directory if needed.
pub fn open(path: &Path) -> rusqlite::Result<Connection> {
    if path.as_os_str() == IN_MEMORY {
        return Connection::open_in_memory();
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

/// True for UNIQUE / PRIMARY KEY / NOT NULL / CHECK / FOREIGN KEY failures.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}
