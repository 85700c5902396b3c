//! Journal rows.

use super::{now_timestamp, parse_timestamp};
use crate::models::Journal;
use rusqlite::{params, Connection, OptionalExtension, Row};

fn row_to_journal(row: &Row<'_>) -> rusqlite::Result<Journal> {
    let created_at: String = row.get(3)?;
    Ok(Journal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
    })
}

pub fn insert(conn: &Connection, user_id: i64, title: &str) -> rusqlite::Result<Journal> {
    conn.execute(
        "INSERT INTO journals (user_id, title, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, title, now_timestamp()],
    )?;
    get_by_id(conn, conn.last_insert_rowid())?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Journal>> {
    conn.query_row(
        "SELECT id, user_id, title, created_at FROM journals WHERE id = ?1",
        params![id],
        row_to_journal,
    )
    .optional()
}

/// Journals of one user, newest first.
pub fn list_for_user(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Journal>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, title, created_at FROM journals
         WHERE user_id = ?1
         ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt.query_map(params![user_id], row_to_journal)?;
    rows.collect()
}

/// The user's first journal, created with the account.
pub fn first_for_user(conn: &Connection, user_id: i64) -> rusqlite::Result<Option<Journal>> {
    conn.query_row(
        "SELECT id, user_id, title, created_at FROM journals
         WHERE user_id = ?1
         ORDER BY created_at ASC, id ASC
         LIMIT 1",
        params![user_id],
        row_to_journal,
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::store::users::{self, NewUser};
    use crate::store::Store;

    fn user_id(store: &Store, username: &str) -> i64 {
        users::insert(
            store.conn(),
            &NewUser {
                name: username,
                username,
                email: None,
                hashed_password: "x",
                role: Role::User,
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn test_list_newest_first_and_scoped_to_user() {
        let store = Store::open_in_memory().unwrap();
        let ada = user_id(&store, "ada");
        let bob = user_id(&store, "bob");

        let first = insert(store.conn(), ada, "Morning pages").unwrap();
        let second = insert(store.conn(), ada, "Travel log").unwrap();
        insert(store.conn(), bob, "Bob's notes").unwrap();

        let listed = list_for_user(store.conn(), ada).unwrap();
        let ids: Vec<i64> = listed.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(listed[1].title, "Morning pages");
    }

    #[test]
    fn test_first_for_user() {
        let store = Store::open_in_memory().unwrap();
        let ada = user_id(&store, "ada");
        let bob = user_id(&store, "bob");
        assert!(first_for_user(store.conn(), ada).unwrap().is_none());

        let first = insert(store.conn(), ada, "ada Journal").unwrap();
        insert(store.conn(), ada, "Travel log").unwrap();
        insert(store.conn(), bob, "bob Journal").unwrap();

        assert_eq!(first_for_user(store.conn(), ada).unwrap().unwrap().id, first.id);
    }

    #[test]
    fn test_journal_requires_existing_user() {
        let store = Store::open_in_memory().unwrap();
        assert!(insert(store.conn(), 42, "Orphan").is_err());
    }
}
