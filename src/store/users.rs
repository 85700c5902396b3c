//! User rows.

use super::{now_timestamp, parse_timestamp};
use crate::models::{Role, User};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// A user together with the stored password hash.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub hashed_password: String,
}

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub username: &'a str,
    pub email: Option<&'a str>,
    pub hashed_password: &'a str,
    pub role: Role,
}

const USER_COLUMNS: &str = "id, name, username, email, role, created_at, hashed_password";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let role: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(UserRecord {
        user: User {
            id: row.get(0)?,
            name: row.get(1)?,
            username: row.get(2)?,
            email: row.get(3)?,
            role: Role::from(role.as_str()),
            created_at: parse_timestamp(5, &created_at)?,
        },
        hashed_password: row.get(6)?,
    })
}

pub fn insert(conn: &Connection, new: &NewUser<'_>) -> rusqlite::Result<User> {
    conn.execute(
        "INSERT INTO users (name, username, email, hashed_password, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.name,
            new.username,
            new.email,
            new.hashed_password,
            new.role.as_str(),
            now_timestamp(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_by_id(conn, id)?
        .map(|record| record.user)
        .ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<UserRecord>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        row_to_record,
    )
    .optional()
}

pub fn get_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<UserRecord>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
        params![username],
        row_to_record,
    )
    .optional()
}
