//! Page rows and the two synchronization entry points.
//!
//! `store_page` persists a first-time page with all of its sections;
//! `update_page` reconciles a refreshed extraction against stored rows.
//! Both run in a single transaction so `updated_at` only advances together
//! with the section state it describes.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

use super::connection::PageDb;
use super::sections::{collapse_duplicate_keys, delete_sections, existing_keys, insert_sections, update_sections};
use super::{SectionContent, decode_ts, encode_ts};
use crate::Error;
use crate::title::title_from_slug;

/// A synchronized external document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub slug: String,
    pub title: String,
    /// Last fetched markup, with any editorial overrides applied.
    pub full_code: String,
    pub created_at: DateTime<Utc>,
    /// Time of the last successful synchronization.
    pub updated_at: DateTime<Utc>,
}

/// Fields for a page that has never been stored.
#[derive(Debug, Clone)]
pub struct NewPage {
    pub slug: String,
    pub title: String,
    pub full_code: String,
}

impl NewPage {
    /// New page with a title derived from its slug.
    pub fn new(slug: impl Into<String>, full_code: impl Into<String>) -> Self {
        let slug = slug.into();
        let title = title_from_slug(&slug);
        Self { slug, title, full_code: full_code.into() }
    }
}

/// Result of a first-time store.
#[derive(Debug, Clone)]
pub enum StoreOutcome {
    /// This call created the page and inserted `sections` rows.
    Created { page: Page, sections: usize },
    /// Another writer already stored this slug; nothing was written.
    Existing(Page),
}

impl StoreOutcome {
    pub fn page(&self) -> &Page {
        match self {
            StoreOutcome::Created { page, .. } | StoreOutcome::Existing(page) => page,
        }
    }

    pub fn into_page(self) -> Page {
        match self {
            StoreOutcome::Created { page, .. } | StoreOutcome::Existing(page) => page,
        }
    }
}

/// Counts from one section reconciliation.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub page: Page,
    pub inserted: usize,
    pub updated: usize,
    pub pruned: usize,
}

impl PageDb {
    /// Get a page by slug.
    ///
    /// Returns None if the slug has never been stored.
    pub async fn get_page(&self, slug: &str) -> Result<Option<Page>, Error> {
        let slug = slug.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Page>, Error> { select_page_by_slug(conn, &slug) })
            .await
            .map_err(Error::from)
    }

    /// Persist a page and all of its sections in one transaction.
    ///
    /// The page insert is an upsert that ignores slug conflicts: if another
    /// writer stored the slug first, nothing is written and that writer's row
    /// is returned as [`StoreOutcome::Existing`].
    pub async fn store_page(
        &self, page: NewPage, sections: Vec<SectionContent>, now: DateTime<Utc>,
    ) -> Result<StoreOutcome, Error> {
        let sections = collapse_duplicate_keys(sections);
        let now = encode_ts(now);

        self.conn
            .call(move |conn| -> Result<StoreOutcome, Error> {
                let tx = conn.transaction()?;

                let created = tx.execute(
                    "INSERT INTO pages (slug, title, full_code, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4)
                     ON CONFLICT(slug) DO NOTHING",
                    params![page.slug, page.title, page.full_code, now],
                )?;

                if created == 0 {
                    let existing = select_page_by_slug(&tx, &page.slug)?
                        .ok_or_else(|| Error::SyncFailed(format!("slug conflict without a row: {}", page.slug)))?;
                    return Ok(StoreOutcome::Existing(existing));
                }

                let page_id = tx.last_insert_rowid();
                let inserted = insert_sections(&tx, page_id, &sections, &now)?;
                let stored = select_page_by_id(&tx, page_id)?
                    .ok_or_else(|| Error::SyncFailed(format!("page {page_id} vanished during store")))?;

                tx.commit()?;
                Ok(StoreOutcome::Created { page: stored, sections: inserted })
            })
            .await
            .map_err(Error::from)
    }

    /// Reconcile a refreshed extraction against a stored page.
    ///
    /// Existing keys are overwritten, new keys inserted, and keys missing from
    /// `sections` deleted only when `prune_missing` is set. The page markup and
    /// `updated_at` move in the same transaction.
    pub async fn update_page(
        &self, page_id: i64, full_code: String, sections: Vec<SectionContent>, prune_missing: bool,
        now: DateTime<Utc>,
    ) -> Result<SyncReport, Error> {
        let sections = collapse_duplicate_keys(sections);
        let now = encode_ts(now);

        self.conn
            .call(move |conn| -> Result<SyncReport, Error> {
                let tx = conn.transaction()?;

                let touched = tx.execute(
                    "UPDATE pages SET full_code = ?2, updated_at = ?3 WHERE id = ?1",
                    params![page_id, full_code, now],
                )?;
                if touched == 0 {
                    return Err(Error::SyncFailed(format!("page {page_id} does not exist")));
                }

                let existing = existing_keys(&tx, page_id)?;
                let extracted: HashSet<String> = sections.iter().map(|s| s.key.clone()).collect();
                let (known, fresh): (Vec<SectionContent>, Vec<SectionContent>) =
                    sections.into_iter().partition(|s| existing.contains(&s.key));

                let inserted = insert_sections(&tx, page_id, &fresh, &now)?;
                let updated = update_sections(&tx, page_id, &known, &now)?;

                let pruned = if prune_missing {
                    let stale: Vec<String> = existing.into_iter().filter(|key| !extracted.contains(key)).collect();
                    delete_sections(&tx, page_id, &stale)?
                } else {
                    0
                };

                let page = select_page_by_id(&tx, page_id)?
                    .ok_or_else(|| Error::SyncFailed(format!("page {page_id} vanished during update")))?;

                tx.commit()?;
                Ok(SyncReport { page, inserted, updated, pruned })
            })
            .await
            .map_err(Error::from)
    }
}

const PAGE_COLUMNS: &str = "id, slug, title, full_code, created_at, updated_at";

fn page_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        slug: row.get(1)?,
        title: row.get(2)?,
        full_code: row.get(3)?,
        created_at: decode_ts(4, &row.get::<_, String>(4)?)?,
        updated_at: decode_ts(5, &row.get::<_, String>(5)?)?,
    })
}

pub(crate) fn select_page_by_slug(conn: &rusqlite::Connection, slug: &str) -> Result<Option<Page>, Error> {
    conn.query_row(&format!("SELECT {PAGE_COLUMNS} FROM pages WHERE slug = ?1"), params![slug], page_from_row)
        .optional()
        .map_err(Error::from)
}

pub(crate) fn select_page_by_id(conn: &rusqlite::Connection, id: i64) -> Result<Option<Page>, Error> {
    conn.query_row(&format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = ?1"), params![id], page_from_row)
        .optional()
        .map_err(Error::from)
}
