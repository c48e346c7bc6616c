// src/config/mod.rs
// Configuration and shared constants

pub mod env;

pub use env::{ConfigValidation, EnvConfig};

use std::time::Duration;

/// How long an outbound completion may run before the task is failed.
/// Also used as the grace period a finished task stays queryable.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Model used when OPENAI_MODEL is not set
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-instruct";

/// Completion API base URL used when OPENAI_BASE_URL is not set
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Process-wide generation parameters substituted for fields the caller omits.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationDefaults {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            max_tokens: 150,
            temperature: 0.7,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}
