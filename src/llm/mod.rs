// src/llm/mod.rs
// Outbound text-completion API: request/response shapes and the client trait

mod openai;

pub use openai::OpenAiCompletionClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Fully-resolved request body sent to the completion endpoint.
///
/// Every generation field is populated: caller values where given,
/// process defaults otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionParams {
    pub model: String,
    pub prompt: String,
    /// Kept as a JSON number so caller values reach the API unaltered
    pub max_tokens: serde_json::Number,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

/// Completion endpoint response (only the fields we read)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamCompletion {
    #[serde(default)]
    pub choices: Vec<UpstreamChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamChoice {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage counters reported by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl UpstreamCompletion {
    /// First choice's text, or empty when the API returned none
    pub fn first_text(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.text.clone())
            .unwrap_or_default()
    }

    pub fn first_finish_reason(&self) -> Option<String> {
        self.choices.first().and_then(|c| c.finish_reason.clone())
    }
}

/// A text-completion API the orchestrator can call.
///
/// Implementations must stop promptly once `cancel` fires and report that as
/// `CompletionError::Cancelled`.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn create_completion(
        &self,
        params: CompletionParams,
        cancel: CancellationToken,
    ) -> anyhow::Result<UpstreamCompletion>;
}
