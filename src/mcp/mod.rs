// src/mcp/mod.rs
// MCP server: the `complete` tool and its response shaping

mod handler;
pub mod requests;

use crate::config::GenerationDefaults;
use crate::error::CompletionError;
use crate::orchestrator::CompletionOrchestrator;
use crate::tasks::CompletionResult;
use requests::validate_request;
use rmcp::{
    ErrorData,
    model::{CallToolResult, Content, ErrorCode, JsonObject, Tool},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Name of the single advertised capability
pub const COMPLETE_TOOL: &str = "complete";

/// Shown instead of an error when the upstream call outlives the timeout
pub const TIMEOUT_MESSAGE: &str = "The completion request timed out. Try a shorter prompt or a lower max_tokens value.";

/// Shown instead of an error when the task was cancelled
pub const CANCELLED_MESSAGE: &str = "The completion request was cancelled.";

const COMPLETE_DESCRIPTION: &str = "Generate a text completion for a prompt using the configured completion model. Returns the generated text.";

/// Declared parameter schema for `complete`
pub fn complete_input_schema() -> JsonObject {
    let defaults = GenerationDefaults::default();
    let schema = json!({
        "type": "object",
        "properties": {
            "prompt": {
                "type": "string",
                "description": "The prompt to complete"
            },
            "max_tokens": {
                "type": "integer",
                "description": "Maximum number of tokens to generate",
                "default": defaults.max_tokens
            },
            "temperature": {
                "type": "number",
                "description": "Sampling temperature; higher is more random",
                "default": defaults.temperature
            },
            "top_p": {
                "type": "number",
                "description": "Nucleus sampling probability mass",
                "default": defaults.top_p
            },
            "frequency_penalty": {
                "type": "number",
                "description": "Penalty for tokens by how often they already appear",
                "default": defaults.frequency_penalty
            },
            "presence_penalty": {
                "type": "number",
                "description": "Penalty for tokens that already appear at all",
                "default": defaults.presence_penalty
            }
        },
        "required": ["prompt"]
    });

    match schema {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

/// Tools advertised by the server
pub fn tools() -> Vec<Tool> {
    vec![Tool::new(
        COMPLETE_TOOL,
        COMPLETE_DESCRIPTION,
        Arc::new(complete_input_schema()),
    )]
}

/// MCP Server state
#[derive(Clone)]
pub struct CompletionServer {
    orchestrator: CompletionOrchestrator,
}

impl CompletionServer {
    pub fn new(orchestrator: CompletionOrchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &CompletionOrchestrator {
        &self.orchestrator
    }

    /// Out-of-band cancellation for the host process. See `CompletionOrchestrator::cancel_task`.
    pub fn cancel_task(&self, id: &str) -> bool {
        self.orchestrator.cancel_task(id)
    }

    /// Dispatch a tool invocation by name.
    ///
    /// `cancel` is the protocol-level cancellation for this request; firing it
    /// cancels the underlying task.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
        cancel: CancellationToken,
    ) -> Result<CallToolResult, ErrorData> {
        match name {
            COMPLETE_TOOL => {
                let arguments = arguments.map(Value::Object).unwrap_or(Value::Null);
                self.complete(&arguments, cancel).await
            }
            other => Err(ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Unknown tool: {}", other),
                None,
            )),
        }
    }

    /// Handle one `complete` invocation
    pub async fn complete(
        &self,
        arguments: &Value,
        cancel: CancellationToken,
    ) -> Result<CallToolResult, ErrorData> {
        let request = match validate_request(arguments) {
            Ok(request) => request,
            Err(reason) => {
                debug!(reason = %reason, "Rejected complete arguments");
                return render_outcome(Err(CompletionError::InvalidParams(reason)));
            }
        };

        if cancel.is_cancelled() {
            return render_outcome(Err(CompletionError::Cancelled));
        }

        let id = CompletionOrchestrator::new_task_id();

        // Protocol cancellation -> task cancellation, for as long as this
        // request future is alive (the guard fires on return or drop)
        let request_done = CancellationToken::new();
        let _request_guard = request_done.clone().drop_guard();
        {
            let orchestrator = self.orchestrator.clone();
            let id = id.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        orchestrator.cancel_task(&id);
                    }
                    _ = request_done.cancelled() => {}
                }
            });
        }

        let outcome = self.orchestrator.complete_task(&id, request).await;
        render_outcome(outcome)
    }
}

/// Map a task outcome onto the caller-visible response
pub fn render_outcome(
    outcome: Result<CompletionResult, CompletionError>,
) -> Result<CallToolResult, ErrorData> {
    match outcome {
        Ok(result) => Ok(CallToolResult::success(vec![Content::text(result.text)])),
        Err(CompletionError::Timeout) => Ok(CallToolResult::success(vec![Content::text(
            TIMEOUT_MESSAGE,
        )])),
        Err(CompletionError::Cancelled) => Ok(CallToolResult::success(vec![Content::text(
            CANCELLED_MESSAGE,
        )])),
        Err(CompletionError::InvalidParams(reason)) => Err(ErrorData::invalid_params(
            format!("Invalid completion parameters: {}", reason),
            None,
        )),
        Err(CompletionError::Upstream(message)) => {
            warn!(error = %message, "Completion API error");
            Err(ErrorData::invalid_request(message, None))
        }
        Err(
            err @ (CompletionError::DuplicateTask(_)
            | CompletionError::Config(_)
            | CompletionError::Internal(_)),
        ) => Err(ErrorData::internal_error(err.to_string(), None)),
    }
}
