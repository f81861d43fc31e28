//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::state::AppState;
use crate::tools::cache::{CacheRefreshParams, refresh_impl, status_impl};
use crate::tools::model_page::{ModelPageParams, page_impl};
use crate::tools::model_query::{ModelQueryParams, query_impl};

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

/// The main MCP server handler for remote-models.
#[derive(Clone)]
pub struct RemoteModelsServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl RemoteModelsServer {
    /// Create a new server handler.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    /// Serve one page of a hosted model to another instance.
    #[tool(
        description = "Serve one page (15 rows) of a hosted model as {data, current_page, last_page, per_page, total}. Requires the shared api_key."
    )]
    async fn model_page(&self, params: Parameters<ModelPageParams>) -> Result<CallToolResult, McpError> {
        page_impl(&self.state, params.0).await
    }

    /// Query a configured model's local mirror.
    #[tool(
        description = "Read rows of a configured model from its local mirror, optionally filtered by column = value. Builds the mirror on first use."
    )]
    async fn model_query(&self, params: Parameters<ModelQueryParams>) -> Result<CallToolResult, McpError> {
        query_impl(&self.state, params.0).await
    }

    /// Report cache decisions without network access.
    #[tool(description = "Show, for each configured model, whether its cache is fresh, needs a rebuild, or would be ephemeral.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.state).await
    }

    /// Discard and rebuild one model's cache.
    #[tool(description = "Invalidate a model's cache file and TTL marker, then rebuild it from the remote.")]
    async fn cache_refresh(&self, params: Parameters<CacheRefreshParams>) -> Result<CallToolResult, McpError> {
        refresh_impl(&self.state, params.0).await
    }
}

impl ServerHandler for RemoteModelsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "remote-models".into(),
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
