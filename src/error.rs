// src/error.rs
// Error kinds for completion tasks

use thiserror::Error;

/// Every way a `complete` invocation can fail.
///
/// The MCP layer matches on the kind to decide between a friendly text
/// response (`Timeout`, `Cancelled`) and a protocol-level error (everything else).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompletionError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Completion timed out")]
    Timeout,

    #[error("Task cancelled")]
    Cancelled,

    #[error("{0}")]
    Upstream(String),

    #[error("task {0} already exists")]
    DuplicateTask(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Result using CompletionError
pub type Result<T> = std::result::Result<T, CompletionError>;

impl CompletionError {
    /// Classify a failure from the outbound call.
    ///
    /// Timeout/cancellation kinds pass through unchanged, an aborted token
    /// turns anything else into `Cancelled`, and the rest becomes `Upstream`.
    pub fn from_upstream(err: anyhow::Error, aborted: bool) -> Self {
        match err.downcast::<CompletionError>() {
            Ok(e @ (CompletionError::Timeout | CompletionError::Cancelled)) => e,
            Ok(_) | Err(_) if aborted => CompletionError::Cancelled,
            Ok(CompletionError::Upstream(msg)) => CompletionError::Upstream(msg),
            Ok(other) => CompletionError::Upstream(other.to_string()),
            Err(e) => CompletionError::Upstream(e.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for CompletionError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            CompletionError::Cancelled
        } else {
            CompletionError::Internal(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        assert_eq!(CompletionError::Timeout.to_string(), "Completion timed out");
    }

    #[test]
    fn test_upstream_carries_message() {
        let err = CompletionError::Upstream("Incorrect API key provided".to_string());
        assert_eq!(err.to_string(), "Incorrect API key provided");
    }

    #[test]
    fn test_invalid_params_message() {
        let err = CompletionError::InvalidParams("prompt must be a string".to_string());
        assert!(err.to_string().contains("invalid parameters"));
        assert!(err.to_string().contains("prompt must be a string"));
    }

    // ============================================================================
    // from_upstream classification
    // ============================================================================

    #[test]
    fn test_from_upstream_keeps_timeout() {
        let err = anyhow::Error::new(CompletionError::Timeout);
        assert_eq!(CompletionError::from_upstream(err, true), CompletionError::Timeout);
    }

    #[test]
    fn test_from_upstream_keeps_cancelled() {
        let err = anyhow::Error::new(CompletionError::Cancelled);
        assert_eq!(
            CompletionError::from_upstream(err, false),
            CompletionError::Cancelled
        );
    }

    #[test]
    fn test_from_upstream_aborted_token_means_cancelled() {
        let err = anyhow::anyhow!("connection reset");
        assert_eq!(
            CompletionError::from_upstream(err, true),
            CompletionError::Cancelled
        );
    }

    #[test]
    fn test_from_upstream_wraps_plain_error() {
        let err = anyhow::anyhow!("Rate limit reached");
        assert_eq!(
            CompletionError::from_upstream(err, false),
            CompletionError::Upstream("Rate limit reached".to_string())
        );
    }

    #[test]
    fn test_from_upstream_unwraps_upstream_kind() {
        let err = anyhow::Error::new(CompletionError::Upstream("bad model".into()));
        assert_eq!(
            CompletionError::from_upstream(err, false),
            CompletionError::Upstream("bad model".to_string())
        );
    }
}
