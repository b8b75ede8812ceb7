//! Section rows and the set-oriented statements that reconcile them.
//!
//! Every bulk helper takes a plain `rusqlite::Connection` so it can run inside
//! the transaction opened by the page-level operation that owns it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, ToSql};

use super::connection::PageDb;
use super::{decode_ts, encode_ts, numbered_placeholders};
use crate::Error;

/// Rows per multi-row statement; keeps bound parameters well under SQLite's limit.
const CHUNK_ROWS: usize = 100;

/// A stored named fragment of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub page_id: i64,
    pub section_key: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Section content keyed by its element identifier, as extracted or edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionContent {
    pub key: String,
    pub content: String,
}

impl SectionContent {
    pub fn new(key: impl Into<String>, content: impl Into<String>) -> Self {
        Self { key: key.into(), content: content.into() }
    }
}

/// Collapse repeated keys, last content wins.
///
/// Each key keeps the position of its first occurrence so the result order
/// stays stable when a later duplicate only changes content.
pub fn collapse_duplicate_keys(sections: Vec<SectionContent>) -> Vec<SectionContent> {
    let mut position: HashMap<String, usize> = HashMap::with_capacity(sections.len());
    let mut out: Vec<SectionContent> = Vec::with_capacity(sections.len());

    for section in sections {
        match position.get(&section.key) {
            Some(&idx) => out[idx].content = section.content,
            None => {
                position.insert(section.key.clone(), out.len());
                out.push(section);
            }
        }
    }

    out
}

impl PageDb {
    /// All stored sections of a page, in insertion order.
    pub async fn list_sections(&self, page_id: i64) -> Result<Vec<Section>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<Section>, Error> { select_sections(conn, page_id) })
            .await
            .map_err(Error::from)
    }

    /// Overwrite the content of existing sections (editorial override).
    ///
    /// Every key must already be stored for this page; otherwise nothing is
    /// written. When `full_code` is given the page markup is replaced in the
    /// same transaction. The page's `updated_at` is left alone so the next
    /// scheduled refresh still happens on time.
    pub async fn apply_section_edits(
        &self, page_id: i64, edits: Vec<SectionContent>, full_code: Option<String>, now: DateTime<Utc>,
    ) -> Result<Vec<Section>, Error> {
        let edits = collapse_duplicate_keys(edits);
        let now = encode_ts(now);

        self.conn
            .call(move |conn| -> Result<Vec<Section>, Error> {
                let tx = conn.transaction()?;

                let existing = existing_keys(&tx, page_id)?;
                let unknown: Vec<&str> = edits
                    .iter()
                    .map(|edit| edit.key.as_str())
                    .filter(|key| !existing.contains(*key))
                    .collect();
                if !unknown.is_empty() {
                    return Err(Error::InvalidInput(format!("unknown section keys: {}", unknown.join(", "))));
                }

                update_sections(&tx, page_id, &edits, &now)?;

                if let Some(full_code) = full_code {
                    tx.execute("UPDATE pages SET full_code = ?2 WHERE id = ?1", params![page_id, full_code])?;
                }

                let edited: HashSet<&str> = edits.iter().map(|edit| edit.key.as_str()).collect();
                let sections = select_sections(&tx, page_id)?
                    .into_iter()
                    .filter(|section| edited.contains(section.section_key.as_str()))
                    .collect();

                tx.commit()?;
                Ok(sections)
            })
            .await
            .map_err(Error::from)
    }
}

pub(crate) fn select_sections(conn: &rusqlite::Connection, page_id: i64) -> Result<Vec<Section>, Error> {
    let mut stmt = conn.prepare(
        "SELECT id, page_id, section_key, content, created_at, updated_at
         FROM sections WHERE page_id = ?1 ORDER BY id",
    )?;

    let rows = stmt.query_map(params![page_id], |row| {
        Ok(Section {
            id: row.get(0)?,
            page_id: row.get(1)?,
            section_key: row.get(2)?,
            content: row.get(3)?,
            created_at: decode_ts(4, &row.get::<_, String>(4)?)?,
            updated_at: decode_ts(5, &row.get::<_, String>(5)?)?,
        })
    })?;

    rows.collect::<Result<Vec<_>, _>>().map_err(Error::from)
}

/// Keys currently stored for a page, in one query.
pub(crate) fn existing_keys(conn: &rusqlite::Connection, page_id: i64) -> Result<HashSet<String>, Error> {
    let mut stmt = conn.prepare("SELECT section_key FROM sections WHERE page_id = ?1")?;
    let keys = stmt.query_map(params![page_id], |row| row.get::<_, String>(0))?;
    keys.collect::<Result<HashSet<_>, _>>().map_err(Error::from)
}

/// Multi-row insert of new sections.
pub(crate) fn insert_sections(
    conn: &rusqlite::Connection, page_id: i64, sections: &[SectionContent], now: &str,
) -> Result<usize, Error> {
    let mut inserted = 0;

    for chunk in sections.chunks(CHUNK_ROWS) {
        let values = (0..chunk.len())
            .map(|i| format!("(?1, ?{}, ?{}, ?2, ?2)", 3 + i * 2, 4 + i * 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql =
            format!("INSERT INTO sections (page_id, section_key, content, created_at, updated_at) VALUES {values}");

        let mut bound: Vec<&dyn ToSql> = Vec::with_capacity(2 + chunk.len() * 2);
        bound.push(&page_id);
        bound.push(&now);
        for section in chunk {
            bound.push(&section.key);
            bound.push(&section.content);
        }

        inserted += conn.execute(&sql, bound.as_slice())?;
    }

    Ok(inserted)
}

/// Overwrite content of existing sections with one `UPDATE ... CASE` per chunk.
pub(crate) fn update_sections(
    conn: &rusqlite::Connection, page_id: i64, sections: &[SectionContent], now: &str,
) -> Result<usize, Error> {
    let mut updated = 0;

    for chunk in sections.chunks(CHUNK_ROWS) {
        let cases = (0..chunk.len())
            .map(|i| format!("WHEN ?{} THEN ?{}", 3 + i * 2, 4 + i * 2))
            .collect::<Vec<_>>()
            .join(" ");
        let keys = (0..chunk.len())
            .map(|i| format!("?{}", 3 + i * 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE sections SET content = CASE section_key {cases} END, updated_at = ?2
             WHERE page_id = ?1 AND section_key IN ({keys})"
        );

        let mut bound: Vec<&dyn ToSql> = Vec::with_capacity(2 + chunk.len() * 2);
        bound.push(&page_id);
        bound.push(&now);
        for section in chunk {
            bound.push(&section.key);
            bound.push(&section.content);
        }

        updated += conn.execute(&sql, bound.as_slice())?;
    }

    Ok(updated)
}

/// Delete the named sections of a page.
pub(crate) fn delete_sections(conn: &rusqlite::Connection, page_id: i64, keys: &[String]) -> Result<usize, Error> {
    let mut deleted = 0;

    for chunk in keys.chunks(CHUNK_ROWS * 2) {
        let sql = format!(
            "DELETE FROM sections WHERE page_id = ?1 AND section_key IN ({})",
            numbered_placeholders(2, chunk.len())
        );

        let mut bound: Vec<&dyn ToSql> = Vec::with_capacity(1 + chunk.len());
        bound.push(&page_id);
        for key in chunk {
            bound.push(key);
        }

        deleted += conn.execute(&sql, bound.as_slice())?;
    }

    Ok(deleted)
}
