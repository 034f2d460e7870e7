use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use courier_core::ProcessedRecord;

use crate::sqlite;
use crate::task_types::CommitGate;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness or other schema constraint rejected the write.
    #[error("integrity error: {0}")]
    Integrity(rusqlite::Error),
    #[error("database error: {0}")]
    Database(rusqlite::Error),
    #[error("database lock poisoned")]
    LockPoisoned,
    /// The owning task was terminated before the write could commit.
    #[error("write rolled back: task terminated")]
    Terminated,
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if sqlite::is_constraint_violation(&e) {
            StoreError::Integrity(e)
        } else {
            StoreError::Database(e)
        }
    }
}

/// SQLite-backed store of processed messages.
#[derive(Clone)]
pub struct RecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl RecordStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = sqlite::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS processed_data (
                id                BLOB PRIMARY KEY,
                email             TEXT NOT NULL,
                original_message  TEXT NOT NULL,
                processed_message TEXT NOT NULL,
                created_at        TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS processed_data_email ON processed_data (email);",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::open(Path::new(sqlite::IN_MEMORY))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Create a new record with a fresh id and the current time.
    pub fn insert(
        &self,
        email: &str,
        original_message: &str,
        processed_message: &str,
    ) -> Result<ProcessedRecord, StoreError> {
        let record = ProcessedRecord::new(email, original_message, processed_message);
        self.insert_record(&record)?;
        Ok(record)
    }

    /// Like `insert`, but commits only if `gate` can still be claimed once
    /// the connection lock is held. Otherwise the write is rolled back.
    pub fn insert_gated(
        &self,
        email: &str,
        original_message: &str,
        processed_message: &str,
        gate: &CommitGate,
    ) -> Result<ProcessedRecord, StoreError> {
        let record = ProcessedRecord::new(email, original_message, processed_message);
        let mut conn = self.lock()?;
        if gate.is_terminated() {
            return Err(StoreError::Terminated);
        }
        let tx = conn.transaction()?;
        write_record(&tx, &record)?;
        if !gate.try_commit() {
            return Err(StoreError::Terminated);
        }
        tx.commit()?;
        Ok(record)
    }

    /// Persist a fully-formed record. Fails with `Integrity` if the id exists.
    pub fn insert_record(&self, record: &ProcessedRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        write_record(&conn, record)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<ProcessedRecord>, StoreError> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT id, email, original_message, processed_message, created_at
                 FROM processed_data WHERE id = ?1",
                [id],
                from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// All records for an address, oldest first.
    pub fn list_for_email(&self, email: &str) -> Result<Vec<ProcessedRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, email, original_message, processed_message, created_at
             FROM processed_data WHERE email = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let records = stmt
            .query_map([email], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM processed_data", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn write_record(conn: &Connection, record: &ProcessedRecord) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO processed_data
            (id, email, original_message, processed_message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.id,
            record.email,
            record.original_message,
            record.processed_message,
            record.created_at,
        ],
    )?;
    Ok(())
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<ProcessedRecord> {
    Ok(ProcessedRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        original_message: row.get(2)?,
        processed_message: row.get(3)?,
        created_at: row.get(4)?,
    })
}
