// src/mcp/handler.rs
// MCP ServerHandler implementation: protocol lifecycle methods

use super::CompletionServer;

use rmcp::{
    ErrorData, ServerHandler,
    model::{
        CallToolRequestParams, CallToolResult, ListToolsResult, PaginatedRequestParams,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
};

impl ServerHandler for CompletionServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: "completion-mcp".into(),
                title: Some("Text completion over MCP".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Call the `complete` tool with a prompt to generate text with {}.",
                self.orchestrator().config().model
            )),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            tools: super::tools(),
            next_cursor: None,
            meta: None,
        }))
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        async move {
            let tool_name = request.name.to_string();
            let start = std::time::Instant::now();

            let result = self
                .call(&tool_name, request.arguments, context.ct.clone())
                .await;

            tracing::debug!(
                tool = %tool_name,
                duration_ms = start.elapsed().as_millis() as u64,
                success = result.is_ok(),
                "Tool call finished"
            );
            result
        }
    }
}
