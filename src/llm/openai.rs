// src/llm/openai.rs
// OpenAI-compatible legacy completions client (POST {base_url}/completions)

use super::{CompletionBackend, CompletionParams, UpstreamCompletion};
use crate::error::CompletionError;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// OpenAI-style error envelope: `{"error": {"message": "..."}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Completion client for OpenAI and API-compatible servers.
///
/// One attempt per call; retries are left to the caller.
pub struct OpenAiCompletionClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiCompletionClient {
    /// Create a client with a shared HTTP client
    pub fn new(api_key: String, base_url: String, client: reqwest::Client) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/completions", self.base_url)
    }

    async fn send(&self, params: &CompletionParams, request_id: &str) -> Result<UpstreamCompletion> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(params)
            .send()
            .await
            .map_err(|e| anyhow!("Request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read completion response: {}", e))?;

        if !status.is_success() {
            debug!(request_id = %request_id, status = %status, "Completion API rejected request");
            return Err(anyhow!(upstream_error_message(status, &body)));
        }

        serde_json::from_str(&body).map_err(|e| anyhow!("Failed to parse completion response: {}", e))
    }
}

/// Prefer the API's own error message; fall back to status + raw body
fn upstream_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => format!("API error {}: {}", status, body.trim()),
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletionClient {
    async fn create_completion(
        &self,
        params: CompletionParams,
        cancel: CancellationToken,
    ) -> Result<UpstreamCompletion> {
        let request_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        debug!(
            request_id = %request_id,
            model = %params.model,
            prompt_chars = params.prompt.len(),
            "Sending completion request"
        );

        // Dropping the in-flight request future aborts the connection
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CompletionError::Cancelled.into()),
            result = self.send(&params, &request_id) => result?,
        };

        info!(
            request_id = %request_id,
            model = %params.model,
            duration_ms = start.elapsed().as_millis() as u64,
            total_tokens = response.usage.as_ref().map(|u| u.total_tokens),
            "Completion request finished"
        );

        Ok(response)
    }
}
