//! SQLite adapter: Implementation of HistoryRepository.
//!
//! Stores one row per health record: the owning user, the capture time and
//! the nested vitals document as JSON text.
//!
//! # Timestamps
//!
//! `recorded_at` is written as fixed-width RFC 3339 UTC with microsecond
//! precision, so lexicographic order in SQL matches chronological order.
//!
//! # Mutex Behavior
//!
//! The connection is protected by a `Mutex`. A poisoned lock is reported as
//! [`HistoryError::LockPoisoned`]; callers of the prediction path treat that
//! like any other history failure.
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};

use crate::domain::HistoricalSnapshot;
use crate::ports::HistoryRepository;

/// Error type for history storage.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// SQLite-backed store of past health records.
pub struct SqliteHistory {
    conn: Mutex<Connection>,
}

impl SqliteHistory {
    /// Open (or create) the record store at `path`.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, HistoryError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, HistoryError> {
        self.conn.lock().map_err(|_| HistoryError::LockPoisoned)
    }

    fn init_schema(&self) -> Result<(), HistoryError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS health_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                document TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_health_records_user_time
                ON health_records(user_id, recorded_at);
            ",
        )?;

        Ok(())
    }

    fn timestamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Append a record for `user_id`. Returns the new row id.
    ///
    /// # Errors
    /// Returns error if the document cannot be serialized or the insert fails.
    pub fn insert_record(
        &self,
        user_id: &str,
        snapshot: &HistoricalSnapshot,
    ) -> Result<i64, HistoryError> {
        let document = serde_json::to_string(&snapshot.vitals)
            .map_err(|e| HistoryError::Serialization(e.to_string()))?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO health_records (user_id, recorded_at, document) VALUES (?1, ?2, ?3)",
            params![user_id, Self::timestamp(snapshot.recorded_at), document],
        )?;

        let id = conn.last_insert_rowid();
        tracing::debug!("Stored health record {} for user", id);
        Ok(id)
    }

    /// Number of stored records for `user_id`.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn count_records(&self, user_id: &str) -> Result<usize, HistoryError> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM health_records WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl HistoryRepository for SqliteHistory {
    type Error = HistoryError;

    fn fetch_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoricalSnapshot>, Self::Error> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r"
            SELECT recorded_at, document
            FROM health_records
            WHERE user_id = ?1 AND recorded_at >= ?2
            ORDER BY recorded_at ASC, id ASC
            ",
        )?;

        let rows = stmt
            .query_map(params![user_id, Self::timestamp(since)], |row| {
                let recorded_at: String = row.get(0)?;
                let document: String = row.get(1)?;
                Ok((recorded_at, document))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(recorded_at, document)| -> Result<HistoricalSnapshot, HistoryError> {
                let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| HistoryError::Serialization(e.to_string()))?;
                let vitals: serde_json::Value = serde_json::from_str(&document)
                    .map_err(|e| HistoryError::Serialization(e.to_string()))?;
                Ok(HistoricalSnapshot::new(recorded_at, vitals))
            })
            .collect()
    }
}
