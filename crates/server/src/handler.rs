//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker-backed implementations.
use crate::tools::{
    CacheListParams, OfflineFetchParams, SyncTriggerParams, WorkerLifecycleParams, fetch_impl, lifecycle_impl,
    list_impl, trigger_impl,
};

use harbor_client::OfflineWorker;
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

/// The main MCP server handler for harbor.
#[derive(Clone)]
pub struct HarborServer {
    worker: OfflineWorker,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl HarborServer {
    /// Create a new server handler around an installed worker.
    pub fn new(worker: OfflineWorker) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    /// Fetch a URL through the offline worker.
    ///
    /// The request is classified and served with the matching strategy, so the
    /// response may come from the network, a cache partition, or the offline root page.
    #[tool(
        description = "Fetch a URL through the offline cache worker. Returns the response and whether it came from the network, the cache, or the offline fallback."
    )]
    async fn offline_fetch(&self, params: Parameters<OfflineFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache partitions and the URLs stored in each.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.worker, params.0).await
    }

    #[tool(description = "Re-run install and activate. Precaches critical assets and deletes partitions of older versions.")]
    async fn worker_lifecycle(&self, params: Parameters<WorkerLifecycleParams>) -> Result<CallToolResult, McpError> {
        lifecycle_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a background sync event for a tag such as sync-saved-tools.")]
    async fn sync_trigger(&self, params: Parameters<SyncTriggerParams>) -> Result<CallToolResult, McpError> {
        trigger_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for HarborServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "harbor".into(),
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
