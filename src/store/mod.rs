//! SQLite persistence for users, journals and entries.
//!
//! `Store` owns the connection and applies pragmas and migrations on open.
//! Queries are free functions over `&Connection` grouped per table, so they
//! work equally on the plain connection and inside a transaction.

pub mod entries;
pub mod journals;
mod schema;
pub mod users;

use crate::error::AppResult;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use tracing::debug;

/// Owns the database connection.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) a database file.
    pub fn open(path: &Path) -> AppResult<Self> {
        debug!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
        Self::initialize(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> AppResult<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> AppResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start a transaction that takes the write lock immediately, so a
    /// read-modify-write of one entry cannot interleave with another writer.
    pub fn write_transaction(&mut self) -> AppResult<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_file_runs_migrations() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("diary.db");

        {
            let store = Store::open(&path).unwrap();
            assert_eq!(schema::current_version(store.conn()).unwrap(), schema::LATEST_VERSION);
        }

        // Reopening an up-to-date database is a no-op.
        let store = Store::open(&path).unwrap();
        assert_eq!(schema::current_version(store.conn()).unwrap(), schema::LATEST_VERSION);
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp(0, "2026-01-02T03:04:05+00:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-01-02T03:04:05+00:00");
        assert!(parse_timestamp(0, "yesterday").is_err());
    }
}
