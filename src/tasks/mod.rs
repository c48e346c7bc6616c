// src/tasks/mod.rs
// In-memory completion task state

mod registry;

pub use registry::TaskRegistry;

use crate::llm::Usage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one `complete` invocation.
///
/// Pending -> Processing -> Complete | Error. Complete and Error are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Complete,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Complete | TaskStatus::Error)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Complete => write!(f, "complete"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Normalized success payload of a completion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionResult {
    pub text: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// One tracked invocation. Snapshots handed out by the registry are copies.
#[derive(Debug, Clone)]
pub struct CompletionTask {
    pub id: String,
    pub status: TaskStatus,
    /// Set only when status is Complete
    pub result: Option<CompletionResult>,
    /// Set only when status is Error
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// 0 until the task completes, then 100
    pub progress: u8,
    cancel: CancellationToken,
}

impl CompletionTask {
    /// New Pending task whose deadline is `timeout` from now
    pub fn new(id: impl Into<String>, timeout: Duration) -> Self {
        let created_at = Utc::now();
        let deadline = chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|d| created_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            id: id.into(),
            status: TaskStatus::Pending,
            result: None,
            error: None,
            created_at,
            deadline,
            finished_at: None,
            progress: 0,
            cancel: CancellationToken::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Child of the task's cancellation handle, for the outbound call to observe
    pub(crate) fn cancel_signal(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fire the cancellation handle
    pub(crate) fn trigger_cancel(&self) {
        self.cancel.cancel();
    }

    /// Pending -> Processing. Returns false for any other starting state.
    pub fn start_processing(&mut self) -> bool {
        if self.status != TaskStatus::Pending {
            return false;
        }
        self.status = TaskStatus::Processing;
        true
    }

    /// Move to Complete unless already terminal
    pub fn complete(&mut self, result: CompletionResult) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Complete;
        self.progress = 100;
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
        true
    }

    /// Move to Error unless already terminal
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Error;
        self.error = Some(message.into());
        self.finished_at = Some(Utc::now());
        true
    }
}
