// src/cli/serve.rs
// MCP server initialization and main loop

use anyhow::{Result, bail};
use completion_mcp::config::EnvConfig;
use completion_mcp::http::create_shared_client;
use completion_mcp::llm::OpenAiCompletionClient;
use completion_mcp::mcp::CompletionServer;
use completion_mcp::orchestrator::{CompletionOrchestrator, OrchestratorConfig};
use completion_mcp::tasks::TaskRegistry;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Load and validate configuration, then assemble the server.
///
/// Fails before anything else is created when required settings are missing.
pub fn setup_server() -> Result<CompletionServer> {
    let env_config = EnvConfig::load();

    let validation = env_config.validate();
    for warning in &validation.warnings {
        warn!("{}", warning);
    }
    if !validation.is_valid() {
        error!("{}", validation.report());
        bail!("invalid configuration: {}", validation.errors.join("; "));
    }

    let api_key = env_config.require_api_key()?.to_string();

    let backend = OpenAiCompletionClient::new(
        api_key,
        env_config.base_url.clone(),
        create_shared_client(),
    );
    let orchestrator = CompletionOrchestrator::new(
        Arc::new(backend),
        TaskRegistry::new(),
        OrchestratorConfig::from_env(&env_config),
    );

    info!(
        model = %env_config.model,
        base_url = %env_config.base_url,
        timeout_ms = env_config.timeout.as_millis() as u64,
        "Completion backend configured"
    );

    Ok(CompletionServer::new(orchestrator))
}

/// Serve MCP over stdin/stdout until the client disconnects
pub async fn run_mcp_server() -> Result<()> {
    let server = setup_server()?;

    let transport = rmcp::transport::io::stdio();
    let service = rmcp::serve_server(server, transport).await?;
    info!("MCP server running on stdio");
    service.waiting().await?;

    Ok(())
}
