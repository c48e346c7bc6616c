// src/config/env.rs
// Environment-based configuration - single source of truth for all env vars

use super::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT};
use crate::error::{CompletionError, Result};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration validation result
#[derive(Debug)]
pub struct ConfigValidation {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl Default for ConfigValidation {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidation {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Format as a human-readable report
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        if !self.errors.is_empty() {
            lines.push("Errors:".to_string());
            for err in &self.errors {
                lines.push(format!("  - {}", err));
            }
        }

        if !self.warnings.is_empty() {
            lines.push("Warnings:".to_string());
            for warn in &self.warnings {
                lines.push(format!("  - {}", warn));
            }
        }

        if lines.is_empty() {
            "Configuration OK".to_string()
        } else {
            lines.join("\n")
        }
    }
}

/// Environment configuration - all env vars in one place
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Completion API key (OPENAI_API_KEY)
    pub api_key: Option<String>,
    /// Completion API base URL (OPENAI_BASE_URL)
    pub base_url: String,
    /// Model identifier sent with every request (OPENAI_MODEL)
    pub model: String,
    /// Per-task timeout and grace period (COMPLETION_TIMEOUT_MS)
    pub timeout: Duration,
    /// Raw COMPLETION_TIMEOUT_MS value that could not be used, kept for validation
    rejected_timeout: Option<String>,
}

impl EnvConfig {
    /// Load all environment configuration (call once at startup)
    pub fn load() -> Self {
        info!("Loading environment configuration");
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = read("OPENAI_API_KEY").map(|k| k.trim().to_string());

        let base_url = read("OPENAI_BASE_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let model = read("OPENAI_MODEL")
            .map(|m| m.trim().to_string())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let (timeout, rejected_timeout) = match read("COMPLETION_TIMEOUT_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => {
                    debug!(timeout_ms = ms, "Custom completion timeout configured");
                    (Duration::from_millis(ms), None)
                }
                _ => {
                    warn!(value = %raw, "Ignoring invalid COMPLETION_TIMEOUT_MS");
                    (DEFAULT_TIMEOUT, Some(raw))
                }
            },
            None => (DEFAULT_TIMEOUT, None),
        };

        Self {
            api_key,
            base_url,
            model,
            timeout,
            rejected_timeout,
        }
    }

    /// The API key, or a configuration error naming the missing variable
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| CompletionError::Config("OPENAI_API_KEY environment variable is required".into()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::new();

        if self.api_key.is_none() {
            validation.add_error("OPENAI_API_KEY environment variable is required");
        }

        if let Some(ref raw) = self.rejected_timeout {
            validation.add_warning(format!(
                "COMPLETION_TIMEOUT_MS '{}' is not a positive integer, using {} ms",
                raw,
                DEFAULT_TIMEOUT.as_millis()
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            validation.add_warning(format!(
                "OPENAI_BASE_URL '{}' does not look like an http(s) URL",
                self.base_url
            ));
        }

        validation
    }
}

/// Load `.env` files: the per-user file first, then the working directory.
/// Variables already present in the process environment are never overridden.
pub fn load_dotenv() {
    if let Some(home) = dirs::home_dir() {
        load_dotenv_from(&home.join(".completion-mcp/.env"));
    }
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "Loaded .env");
    }
}

/// Load a single `.env` file if it exists. Returns whether anything was loaded.
pub fn load_dotenv_from(path: &Path) -> bool {
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Loaded .env");
            true
        }
        Err(_) => false,
    }
}
