//! Schema migrations, tracked with `PRAGMA user_version`.

use rusqlite::Connection;
use tracing::info;

type Migration = fn(&Connection) -> rusqlite::Result<()>;

const MIGRATIONS: &[Migration] = &[v001_initial];

pub const LATEST_VERSION: i64 = MIGRATIONS.len() as i64;

pub fn current_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Apply every migration newer than the stored version.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let current = current_version(conn)?;

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = i as i64 + 1;
        if version <= current {
            continue;
        }
        let tx = conn.unchecked_transaction()?;
        migration(&tx)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        info!("Applied schema migration v{:03}", version);
    }

    Ok(())
}

/// v001: users, journals, journal_entries.
fn v001_initial(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL,
            username        TEXT NOT NULL UNIQUE,
            email           TEXT,
            hashed_password TEXT NOT NULL,
            role            TEXT NOT NULL DEFAULT 'user',
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS journals (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title       TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_journals_user ON journals(user_id);

        CREATE TABLE IF NOT EXISTS journal_entries (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            journal_id    INTEGER NOT NULL REFERENCES journals(id) ON DELETE CASCADE,
            texts         TEXT NOT NULL DEFAULT '[]',
            label         TEXT,
            probabilities TEXT,
            created_at    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entries_journal ON journal_entries(journal_id);
        ",
    )
}
