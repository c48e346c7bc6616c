// src/cli/mod.rs
// CLI module for completion-mcp commands

use clap::{Parser, Subcommand};

pub mod serve;
pub mod tool;

pub use serve::run_mcp_server;
pub use tool::run_tool;

#[derive(Parser)]
#[command(name = "completion-mcp")]
#[command(about = "Text completion API exposed as an MCP tool")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as MCP server over stdio (default)
    Serve,

    /// Execute a tool directly
    Tool {
        /// Tool name (e.g. complete)
        #[arg(index = 1)]
        name: String,

        /// JSON arguments (e.g. '{"prompt": "Once upon a time"}')
        #[arg(index = 2)]
        args: String,
    },
}
