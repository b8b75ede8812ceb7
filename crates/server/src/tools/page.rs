//! page_get and sections_get tool implementations.
//!
//! Both return `{page, sections}`; only page_get may synchronize.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{AppState, json_result};

/// Parameters naming one page.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageParams {
    /// Page slug, e.g. "about-us" or "events/summer-camp". Empty or "home" is the root page.
    #[serde(default)]
    pub slug: String,
}

/// Resolve a page, fetching it from the source when absent or stale.
pub async fn page_get_impl(state: &AppState, params: PageParams) -> Result<CallToolResult, McpError> {
    let view = state.pages.get_page(&params.slug).await?;
    Ok(json_result(&view)?)
}

/// Return the stored page and sections without contacting the source.
pub async fn sections_get_impl(state: &AppState, params: PageParams) -> Result<CallToolResult, McpError> {
    let view = state.pages.get_sections(&params.slug).await?;
    Ok(json_result(&view)?)
}
