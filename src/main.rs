// src/main.rs
// completion-mcp - text completion exposed as an MCP tool

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use completion_mcp::config::env::load_dotenv;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// COMPLETION_MCP_LOG=debug overrides the per-command default level
fn log_level(default: Level) -> Level {
    std::env::var("COMPLETION_MCP_LOG")
        .ok()
        .and_then(|v| Level::from_str(v.trim()).ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Global .env first, then the working directory; real env vars always win
    load_dotenv();

    let cli = Cli::parse();

    let default_level = match &cli.command {
        Some(Commands::Serve) | None => Level::WARN, // stdout carries protocol frames
        Some(Commands::Tool { .. }) => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(default_level))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        None | Some(Commands::Serve) => {
            cli::run_mcp_server().await?;
        }
        Some(Commands::Tool { name, args }) => {
            cli::run_tool(name, args).await?;
        }
    }

    Ok(())
}
