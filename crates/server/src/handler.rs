//! MCP server handler implementation.
//!
//! Routes tool calls to the host runtime that owns the agent.

use std::sync::Arc;

use crate::host::HostRuntime;
use crate::tools::{AgentFetchParams, activate_impl, fetch_impl, install_impl, stores_impl};

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

/// The MCP server handler for obx-offline.
#[derive(Clone)]
pub struct OfflineServer {
    runtime: Arc<HostRuntime>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl OfflineServer {
    pub fn new(runtime: Arc<HostRuntime>) -> Self {
        Self { runtime, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install the offline agent: precache every configured asset into the current generation's store.")]
    async fn agent_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.runtime).await
    }

    #[tool(description = "Activate the installed agent: delete stores from other generations and take control of all clients.")]
    async fn agent_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.runtime).await
    }

    #[tool(description = "Fetch a URL as the page would. Same-origin GETs are served by the agent (network-first for navigations, stale-while-revalidate for assets) once it controls clients.")]
    async fn agent_fetch(&self, params: Parameters<AgentFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.runtime, params.0).await
    }

    #[tool(description = "List cache stores with entry counts and the current generation's store name.")]
    async fn cache_stores(&self) -> Result<CallToolResult, McpError> {
        stores_impl(&self.runtime).await
    }
}

impl ServerHandler for OfflineServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "obx-offline".into(),
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
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::tests::runtime;

    #[tokio::test]
    async fn test_tools_registered() {
        let (runtime, _) = runtime().await;
        let server = OfflineServer::new(Arc::new(runtime));
        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["agent_activate", "agent_fetch", "agent_install", "cache_stores"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let (runtime, _) = runtime().await;
        let info = OfflineServer::new(Arc::new(runtime)).get_info();
        assert_eq!(info.server_info.name, "obx-offline");
    }
}
