//! Section extraction from raw page markup.
//!
//! Every element carrying a non-empty `id` attribute is a section: the id is
//! the key and the element's inner HTML is the content. Nested identified
//! elements are sections too, in document order.
//!
//! Extraction is pure and deterministic. A page without identified elements
//! yields an empty list, which is a valid result.

pub mod replace;

pub use replace::{Rewrite, replace_sections, rewrite_sections};

use std::collections::HashSet;

use pagesync_core::{DuplicateKeyPolicy, Error, SectionContent, store::collapse_duplicate_keys};
use scraper::{Html, Selector};

/// Extract `(key, content)` sections from `html`.
///
/// Elements whose inner HTML is empty or whitespace-only are skipped. Repeated
/// identifiers are resolved by `duplicates`: [`DuplicateKeyPolicy::LastWins`]
/// keeps one entry at the first position holding the last content, while
/// [`DuplicateKeyPolicy::Reject`] fails with [`Error::DuplicateSection`].
pub fn extract_sections(html: &str, duplicates: DuplicateKeyPolicy) -> Result<Vec<SectionContent>, Error> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("[id]").map_err(|e| Error::ExtractFailed(format!("invalid selector: {e}")))?;

    let mut seen: HashSet<&str> = HashSet::new();
    let mut sections = Vec::new();

    for element in document.select(&selector) {
        let Some(key) = element.value().id().filter(|id| !id.trim().is_empty()) else {
            continue;
        };

        if !seen.insert(key) && duplicates == DuplicateKeyPolicy::Reject {
            return Err(Error::DuplicateSection(key.to_string()));
        }

        let content = element.inner_html();
        if content.trim().is_empty() {
            continue;
        }

        sections.push(SectionContent::new(key, content));
    }

    let sections = collapse_duplicate_keys(sections);
    tracing::trace!(sections = sections.len(), "extracted sections");

    Ok(sections)
}
