//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    AppState, PageParams, PagesListParams, SectionsUpdateParams, page_get_impl, pages_list_impl, sections_get_impl,
    sections_update_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for pagesync.
#[derive(Clone)]
pub struct PageSyncServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl PageSyncServer {
    /// Create a new server handler over shared state.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    /// Resolve a page by slug, synchronizing with the source when the stored
    /// copy is missing or older than the page TTL.
    #[tool(
        description = "Get a page and its sections by slug. Fetches from the source when missing or stale; serves the stored copy if the source is unavailable."
    )]
    async fn page_get(&self, params: Parameters<PageParams>) -> Result<CallToolResult, McpError> {
        page_get_impl(&self.state, params.0).await
    }

    #[tool(description = "Get the stored page and sections for a slug without contacting the source.")]
    async fn sections_get(&self, params: Parameters<PageParams>) -> Result<CallToolResult, McpError> {
        sections_get_impl(&self.state, params.0).await
    }

    /// Editorial override of existing sections.
    #[tool(
        description = "Overwrite the content of existing sections of a stored page. All keys must already exist; returns the updated sections."
    )]
    async fn sections_update(&self, params: Parameters<SectionsUpdateParams>) -> Result<CallToolResult, McpError> {
        sections_update_impl(&self.state, params.0).await
    }

    #[tool(description = "List stored pages (slug, title, updated_at), most recently synchronized first.")]
    async fn pages_list(&self, params: Parameters<PagesListParams>) -> Result<CallToolResult, McpError> {
        pages_list_impl(&self.state, params.0).await
    }
}

impl ServerHandler for PageSyncServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "pagesync".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::state;

    #[tokio::test]
    async fn test_router_lists_all_tools() {
        let server = PageSyncServer::new(Arc::new(state(None).await));
        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["page_get", "pages_list", "sections_get", "sections_update"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let server = PageSyncServer::new(Arc::new(state(None).await));
        let info = server.get_info();
        assert_eq!(info.server_info.name, "pagesync");
        assert!(info.capabilities.tools.is_some());
    }
}
