// src/lib.rs
// completion-mcp - text completion exposed as an MCP tool

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod mcp;
pub mod orchestrator;
pub mod tasks;

pub use error::{CompletionError, Result};
