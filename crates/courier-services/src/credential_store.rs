//! Credential store — user accounts and bearer tokens.
//!
//! Accounts and tokens share one SQLite database. Each user has at most one
//! token; logging in again returns the existing one.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use courier_core::password::{self, PasswordError};
use courier_core::{FieldErrors, LoginResponse, RegisterRequest, User};

use crate::sqlite;

pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
pub const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Client-side problem, reported back field by field.
    #[error("{0}")]
    Invalid(FieldErrors),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("stored password hash unusable: {0}")]
    Password(#[from] PasswordError),
    #[error("database lock poisoned")]
    LockPoisoned,
}

#[derive(Clone)]
pub struct CredentialStore {
    conn: Arc<Mutex<Connection>>,
    secret: Arc<str>,
}

impl CredentialStore {
    /// Open or create the account tables. `secret` peppers every password hash.
    pub fn open(path: &Path, secret: &str) -> Result<Self, CredentialError> {
        let conn = sqlite::open(path)?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS users (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                username      TEXT NOT NULL UNIQUE,
                email         TEXT NOT NULL DEFAULT '',
                password_hash TEXT NOT NULL,
                date_joined   TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE TABLE IF NOT EXISTS tokens (
                key     TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL UNIQUE REFERENCES users (id) ON DELETE CASCADE,
                created TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            secret: Arc::from(secret),
        })
    }

    pub fn in_memory(secret: &str) -> Result<Self, CredentialError> {
        Self::open(Path::new(sqlite::IN_MEMORY), secret)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CredentialError> {
        self.conn.lock().map_err(|_| CredentialError::LockPoisoned)
    }

    /// Create an account from an already-validated request.
    pub fn register(&self, req: &RegisterRequest) -> Result<User, CredentialError> {
        let hash = password::hash_password(&self.secret, &req.password)?;
        let conn = self.lock()?;

        let inserted = conn.execute(
            "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3)",
            params![req.username, req.email, hash],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if sqlite::is_constraint_violation(&e) => {
                let mut errors = FieldErrors::new();
                errors.add("username", DUPLICATE_USERNAME);
                return Err(CredentialError::Invalid(errors));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(User {
            id: conn.last_insert_rowid(),
            username: req.username.clone(),
            email: req.email.clone(),
        })
    }

    /// Check credentials and return the user's token, creating it on first
    /// login.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<LoginResponse, CredentialError> {
        let row: Option<(i64, String, String)> = self
            .lock()?
            .query_row(
                "SELECT id, email, password_hash FROM users WHERE username = ?1",
                [username],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((user_id, email, hash)) = row else {
            return Err(CredentialError::Invalid(FieldErrors::non_field(BAD_CREDENTIALS)));
        };
        // Argon2 verification runs without holding the connection lock.
        if !password::verify_password(&self.secret, password, &hash)? {
            return Err(CredentialError::Invalid(FieldErrors::non_field(BAD_CREDENTIALS)));
        }

        let conn = self.lock()?;
        let existing: Option<String> = conn
            .query_row("SELECT key FROM tokens WHERE user_id = ?1", [user_id], |row| row.get(0))
            .optional()?;
        let token = match existing {
            Some(token) => token,
            None => {
                let token = password::generate_token();
                conn.execute(
                    "INSERT INTO tokens (key, user_id) VALUES (?1, ?2)",
                    params![token, user_id],
                )?;
                token
            }
        };

        Ok(LoginResponse {
            token,
            user_id,
            email,
        })
    }

    /// The account a bearer token belongs to, if any.
    pub fn user_for_token(&self, token: &str) -> Result<Option<User>, CredentialError> {
        let conn = self.lock()?;
        let user = conn
            .query_row(
                "SELECT u.id, u.username, u.email
                 FROM tokens t JOIN users u ON u.id = t.user_id
                 WHERE t.key = ?1",
                [token],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    pub fn user_count(&self) -> Result<usize, CredentialError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}
