//! Page cache: resolves a slug to a stored page, synchronizing with the
//! external source when the page is absent or stale.
//!
//! ### States per slug
//! - Absent: fetch, extract and store; a fetch failure reports not-found
//! - Present and fresh: served from the store as-is
//! - Present and stale: fetch, extract and update; any failure serves the
//!   stored page (stale-but-available)
//!
//! At most one store or update per slug runs at a time in this process.
//! Across processes the store's upsert on slug absorbs racing first stores.

pub mod flight;

pub use flight::{FlightGuard, SingleFlight};

use std::sync::Arc;

use pagesync_core::store::NewPage;
use pagesync_core::title::normalize_slug;
use pagesync_core::{Clock, Error, Page, PageDb, Section, SectionContent, StoreOutcome, SyncPolicy, SystemClock};
use pagesync_core::{freshness, freshness::Freshness};
use serde::Serialize;

use crate::extract::{extract_sections, rewrite_sections};
use crate::fetch::ContentSource;

/// A page with its stored sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub page: Page,
    pub sections: Vec<Section>,
}

/// Entry point for slug lookups.
pub struct PageCache<S> {
    db: PageDb,
    source: S,
    policy: SyncPolicy,
    clock: Arc<dyn Clock>,
    flights: SingleFlight,
}

impl<S: ContentSource> PageCache<S> {
    pub fn new(db: PageDb, source: S, policy: SyncPolicy) -> Self {
        Self::with_clock(db, source, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(db: PageDb, source: S, policy: SyncPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { db, source, policy, clock, flights: SingleFlight::new() }
    }

    pub fn db(&self) -> &PageDb {
        &self.db
    }

    /// Resolve `slug`, synchronizing with the source if needed.
    ///
    /// Fetch and persistence failures never reach the caller: they either get
    /// the stored page or [`Error::NotFound`]. Only failures reading the store
    /// itself are returned.
    pub async fn get_page(&self, slug: &str) -> Result<PageView, Error> {
        let slug = normalize_slug(slug);

        if let Some(page) = self.db.get_page(&slug).await?
            && self.freshness(&page).is_hit()
        {
            tracing::trace!(slug = %slug, "page fresh");
            return self.view(page).await;
        }

        let _flight = self.flights.acquire(&slug).await;

        // A previous holder may have finished the work while we waited.
        match self.db.get_page(&slug).await? {
            None => self.store_absent(&slug).await,
            Some(page) if self.freshness(&page).is_hit() => self.view(page).await,
            Some(page) => self.refresh_stale(page).await,
        }
    }

    /// Stored page and sections without touching the source.
    pub async fn get_sections(&self, slug: &str) -> Result<PageView, Error> {
        let slug = normalize_slug(slug);
        let page = self
            .db
            .get_page(&slug)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no stored page for slug '{slug}'")))?;
        self.view(page).await
    }

    /// Overwrite stored section content directly, bypassing the source.
    ///
    /// Every key must already exist for the page. The page markup is
    /// rewritten to carry the new contents, and identified ancestors of an
    /// edited element are updated so the stored sections keep matching what
    /// extraction of the markup yields. `updated_at` is not advanced.
    pub async fn update_sections(&self, slug: &str, edits: Vec<SectionContent>) -> Result<Vec<Section>, Error> {
        if edits.is_empty() {
            return Err(Error::InvalidInput("no sections to update".into()));
        }

        let slug = normalize_slug(slug);
        let _flight = self.flights.acquire(&slug).await;

        let page = self
            .db
            .get_page(&slug)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no stored page for slug '{slug}'")))?;

        let rewrite = rewrite_sections(&page.full_code, &edits, self.policy.duplicates)?;
        let sections = self
            .db
            .apply_section_edits(page.id, rewrite.sections, Some(rewrite.full_code), self.clock.now())
            .await?;

        tracing::info!(slug = %slug, sections = sections.len(), "applied section edits");
        Ok(sections)
    }

    fn freshness(&self, page: &Page) -> Freshness {
        freshness::evaluate(page.updated_at, self.clock.now(), self.policy.page_ttl)
    }

    async fn view(&self, page: Page) -> Result<PageView, Error> {
        let sections = self.db.list_sections(page.id).await?;
        Ok(PageView { page, sections })
    }

    /// Fetch and extract, or explain why the source is unusable.
    async fn pull(&self, slug: &str) -> Result<(String, Vec<SectionContent>), Error> {
        let markup = self.source.fetch(slug).await?;
        let sections = extract_sections(&markup, self.policy.duplicates)?;
        Ok((markup, sections))
    }

    async fn store_absent(&self, slug: &str) -> Result<PageView, Error> {
        let (markup, sections) = match self.pull(slug).await {
            Ok(pulled) => pulled,
            Err(e) => {
                tracing::warn!(slug, error = %e, "source unavailable for unseen page");
                return Err(Error::NotFound(format!("page '{slug}' is not available")));
            }
        };

        let outcome = match self.db.store_page(NewPage::new(slug, markup), sections, self.clock.now()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(slug, error = %e, "failed to store page");
                return Err(Error::NotFound(format!("page '{slug}' could not be stored")));
            }
        };

        match &outcome {
            StoreOutcome::Created { page, sections } => {
                tracing::info!(slug, page_id = page.id, sections, "stored page");
            }
            StoreOutcome::Existing(page) => {
                tracing::debug!(slug, page_id = page.id, "page stored concurrently elsewhere");
            }
        }

        self.view(outcome.into_page()).await
    }

    async fn refresh_stale(&self, page: Page) -> Result<PageView, Error> {
        let slug = page.slug.clone();

        let (markup, sections) = match self.pull(&slug).await {
            Ok(pulled) => pulled,
            Err(e) => {
                tracing::warn!(slug = %slug, error = %e, "refresh failed, serving stored page");
                return self.view(page).await;
            }
        };

        match self
            .db
            .update_page(page.id, markup, sections, self.policy.prune_missing, self.clock.now())
            .await
        {
            Ok(report) => {
                tracing::info!(
                    slug = %slug,
                    inserted = report.inserted,
                    updated = report.updated,
                    pruned = report.pruned,
                    "refreshed page"
                );
                self.view(report.page).await
            }
            Err(e) => {
                tracing::error!(slug = %slug, error = %e, "failed to update page, serving stored page");
                self.view(page).await
            }
        }
    }
}
