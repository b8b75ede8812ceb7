//! MCP tool implementations.
//!
//! This module contains all tools exposed by the pagesync server.

pub mod page;
pub mod pages_list;
pub mod sections;

pub use page::{PageParams, page_get_impl, sections_get_impl};
pub use pages_list::{PagesListParams, pages_list_impl};
pub use sections::{SectionsUpdateParams, sections_update_impl};

use std::sync::Arc;

use pagesync_client::{ContentSource, PageCache};
use pagesync_core::{Error, PageDb, QueryCache};
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

/// Source handle shared by the page cache; boxed so tests can swap it.
pub type Source = Arc<dyn ContentSource>;

/// Everything the tools need, built once at startup.
pub struct AppState {
    pub pages: PageCache<Source>,
    pub queries: QueryCache<PageDb>,
}

/// Serialize `output` as a pretty JSON text result.
pub(crate) fn json_result(output: &impl Serialize) -> Result<CallToolResult, Error> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use pagesync_core::SyncPolicy;
    use std::time::Duration;

    /// Source serving fixed markup, or failing when there is none.
    pub struct FixedSource(pub Option<&'static str>);

    #[async_trait]
    impl ContentSource for FixedSource {
        async fn fetch(&self, _slug: &str) -> Result<String, Error> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| Error::HttpError("status 404".into()))
        }
    }

    pub async fn state(markup: Option<&'static str>) -> AppState {
        let db = PageDb::open_in_memory().await.unwrap();
        let source: Source = Arc::new(FixedSource(markup));
        AppState {
            pages: PageCache::new(db.clone(), source, SyncPolicy::default()),
            queries: QueryCache::new(db, Duration::from_secs(10)),
        }
    }

    /// Text of the first content block, parsed as JSON.
    pub fn body(result: &CallToolResult) -> serde_json::Value {
        let text = result.content[0].as_text().unwrap().text.clone();
        serde_json::from_str(&text).unwrap()
    }
}
