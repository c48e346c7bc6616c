// src/http.rs
// reqwest client for the outbound completion endpoint

use std::time::Duration;

/// Hard ceiling on a single HTTP exchange. Sits well above any sensible
/// `COMPLETION_TIMEOUT_MS`, so the orchestrator's deadline is what callers see.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle keep-alive connections to the completion host
const MAX_IDLE_CONNECTIONS: usize = 10;

/// Client handed to `OpenAiCompletionClient` at startup.
///
/// Concurrent `complete` calls reuse its keep-alive connections to the one
/// configured base URL.
pub fn create_shared_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS)
        .user_agent(concat!("completion-mcp/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
