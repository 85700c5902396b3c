//! Journal entry rows.
//!
//! Paragraphs and the latest aggregate are stored as JSON text. Reads for
//! display are tolerant of legacy or damaged values; reads that feed a
//! write are strict.

use super::{now_timestamp, parse_timestamp};
use crate::error::AppResult;
use crate::models::{Entry, Mood, MoodAnalysis, MoodDistribution};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

const ENTRY_COLUMNS: &str = "id, journal_id, texts, label, probabilities, created_at";

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let texts: Option<String> = row.get(2)?;
    let label: Option<String> = row.get(3)?;
    let probabilities: Option<String> = row.get(4)?;
    let created_at: String = row.get(5)?;

    Ok(Entry {
        id: row.get(0)?,
        journal_id: row.get(1)?,
        texts: decode_texts(texts.as_deref()),
        label: label
            .and_then(|l| l.parse::<Mood>().ok())
            .unwrap_or(Mood::Neutral),
        probabilities: decode_probabilities(probabilities.as_deref()),
        created_at: parse_timestamp(5, &created_at)?,
    })
}

/// Paragraph list for display.
///
/// A JSON array yields its items; anything else is kept as one paragraph.
pub fn decode_texts(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        _ => vec![raw.to_string()],
    }
}

/// Stored distribution, or the fallback when absent or unreadable.
pub fn decode_probabilities(raw: Option<&str>) -> MoodDistribution {
    raw.and_then(|r| serde_json::from_str(r).ok())
        .unwrap_or(MoodDistribution::FALLBACK)
}

/// Paragraph list that is about to be re-analyzed; must be a JSON array of strings.
fn parse_texts_strict(raw: &str) -> AppResult<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

pub fn insert(conn: &Connection, journal_id: i64) -> rusqlite::Result<Entry> {
    conn.execute(
        "INSERT INTO journal_entries (journal_id, texts, label, probabilities, created_at)
         VALUES (?1, '[]', NULL, NULL, ?2)",
        params![journal_id, now_timestamp()],
    )?;
    get_by_id(conn, conn.last_insert_rowid())?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Entry>> {
    conn.query_row(
        &format!("SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE id = ?1"),
        params![id],
        row_to_entry,
    )
    .optional()
}

/// Journal id of an entry, if the entry exists.
pub fn journal_of(conn: &Connection, id: i64) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT journal_id FROM journal_entries WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
}

/// Entries of one journal in creation order.
pub fn list_for_journal(conn: &Connection, journal_id: i64) -> rusqlite::Result<Vec<Entry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE journal_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![journal_id], row_to_entry)?;
    rows.collect()
}

/// Ids of every entry, for bulk recomputation.
pub fn list_all_ids(conn: &Connection) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM journal_entries ORDER BY id")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

/// Stored paragraphs of an entry, strictly decoded.
pub fn load_texts(conn: &Connection, id: i64) -> AppResult<Option<Vec<String>>> {
    let raw: Option<Option<String>> = conn
        .query_row(
            "SELECT texts FROM journal_entries WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        None => Ok(None),
        Some(None) => Ok(Some(Vec::new())),
        Some(Some(raw)) => Ok(Some(parse_texts_strict(&raw)?)),
    }
}

/// Append paragraphs and return the full list, oldest first.
pub fn append_paragraphs(conn: &Connection, id: i64, paragraphs: &[String]) -> AppResult<Vec<String>> {
    let mut texts = load_texts(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
    texts.extend_from_slice(paragraphs);

    conn.execute(
        "UPDATE journal_entries SET texts = ?1 WHERE id = ?2",
        params![serde_json::to_string(&texts)?, id],
    )?;

    Ok(texts)
}

/// Overwrite the stored aggregate.
pub fn update_analysis(conn: &Connection, id: i64, analysis: &MoodAnalysis) -> AppResult<()> {
    conn.execute(
        "UPDATE journal_entries SET label = ?1, probabilities = ?2 WHERE id = ?3",
        params![
            analysis.label.as_str(),
            serde_json::to_string(&analysis.probabilities)?,
            id
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::store::users::{self, NewUser};
    use crate::store::{journals, Store};

    fn store_with_journal() -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        let user = users::insert(
            store.conn(),
            &NewUser {
                name: "Ada",
                username: "ada",
                email: None,
                hashed_password: "x",
                role: Role::User,
            },
        )
        .unwrap();
        let journal = journals::insert(store.conn(), user.id, "Diary").unwrap();
        (store, journal.id)
    }

    #[test]
    fn test_new_entry_defaults() {
        let (store, journal_id) = store_with_journal();
        let entry = insert(store.conn(), journal_id).unwrap();

        assert!(entry.texts.is_empty());
        assert_eq!(entry.label, Mood::Neutral);
        assert_eq!(entry.probabilities, MoodDistribution::FALLBACK);
        assert_eq!(journal_of(store.conn(), entry.id).unwrap(), Some(journal_id));
    }

    #[test]
    fn test_append_and_update_analysis() {
        let (store, journal_id) = store_with_journal();
        let entry = insert(store.conn(), journal_id).unwrap();

        let texts = append_paragraphs(store.conn(), entry.id, &["first".to_string()]).unwrap();
        assert_eq!(texts, vec!["first"]);
        let texts = append_paragraphs(
            store.conn(),
            entry.id,
            &["second".to_string(), "third".to_string()],
        )
        .unwrap();
        assert_eq!(texts, vec!["first", "second", "third"]);

        let analysis = MoodAnalysis {
            label: Mood::Positive,
            probabilities: MoodDistribution {
                negative: 0.1,
                neutral: 0.2,
                positive: 0.7,
            },
        };
        update_analysis(store.conn(), entry.id, &analysis).unwrap();

        let stored = get_by_id(store.conn(), entry.id).unwrap().unwrap();
        assert_eq!(stored.texts, vec!["first", "second", "third"]);
        assert_eq!(stored.label, Mood::Positive);
        assert_eq!(stored.probabilities, analysis.probabilities);
    }

    #[test]
    fn test_append_to_missing_entry_fails() {
        let (store, _) = store_with_journal();
        assert!(append_paragraphs(store.conn(), 77, &["x".to_string()]).is_err());
        assert!(load_texts(store.conn(), 77).unwrap().is_none());
    }

    #[test]
    fn test_damaged_texts_are_strict_for_writes() {
        let (store, journal_id) = store_with_journal();
        let entry = insert(store.conn(), journal_id).unwrap();
        store
            .conn()
            .execute(
                "UPDATE journal_entries SET texts = 'plain words' WHERE id = ?1",
                params![entry.id],
            )
            .unwrap();

        assert!(load_texts(store.conn(), entry.id).is_err());

        let shown = get_by_id(store.conn(), entry.id).unwrap().unwrap();
        assert_eq!(shown.texts, vec!["plain words"]);
    }

    #[test]
    fn test_decode_texts() {
        assert!(decode_texts(None).is_empty());
        assert_eq!(decode_texts(Some(r#"["a","b"]"#)), vec!["a", "b"]);
        assert_eq!(decode_texts(Some(r#"["a",3]"#)), vec!["a", "3"]);
        assert_eq!(decode_texts(Some(r#"{"x":1}"#)), vec![r#"{"x":1}"#]);
        assert_eq!(decode_texts(Some("not json")), vec!["not json"]);
    }

    #[test]
    fn test_decode_probabilities() {
        assert_eq!(decode_probabilities(None), MoodDistribution::FALLBACK);
        assert_eq!(decode_probabilities(Some("garbage")), MoodDistribution::FALLBACK);
        let dist =
            decode_probabilities(Some(r#"{"negative":0.5,"neutral":0.25,"positive":0.25}"#));
        assert_eq!(dist.negative, 0.5);
    }

    #[test]
    fn test_list_for_journal_in_order() {
        let (store, journal_id) = store_with_journal();
        let a = insert(store.conn(), journal_id).unwrap();
        let b = insert(store.conn(), journal_id).unwrap();

        let ids: Vec<i64> = list_for_journal(store.conn(), journal_id)
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert_eq!(list_all_ids(store.conn()).unwrap(), vec![a.id, b.id]);
    }
}
