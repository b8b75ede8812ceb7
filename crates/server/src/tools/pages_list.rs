//! pages_list tool implementation.
//!
//! Lists stored pages, most recently synchronized first. Served through the
//! query cache, so results may lag writes by up to the query TTL.

use pagesync_core::{Error, SqlValue};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AppState, json_result};

const LIST_PAGES: &str = "SELECT slug, title, updated_at FROM pages ORDER BY updated_at DESC, slug LIMIT ?1";

const MAX_LIMIT: u32 = 500;

/// Parameters for the pages_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PagesListParams {
    /// Maximum number of pages to return (default: 50, max: 500).
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Output from the pages_list tool.
#[derive(Debug, Clone, Serialize)]
pub struct PagesListOutput {
    /// `{slug, title, updated_at}` per page.
    pub pages: Vec<Map<String, Value>>,
}

pub async fn pages_list_impl(state: &AppState, params: PagesListParams) -> Result<CallToolResult, McpError> {
    let limit = params.limit.unwrap_or(50);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(Error::InvalidInput(format!("limit must be between 1 and {MAX_LIMIT}")).into());
    }

    let rows = state
        .queries
        .cached_read(LIST_PAGES, &[SqlValue::Integer(i64::from(limit))])
        .await?;

    Ok(json_result(&PagesListOutput { pages: rows.to_json_rows() })?)
}
