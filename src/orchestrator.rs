// src/orchestrator.rs
// Drives one completion task end to end: register, call upstream racing a
// timeout, record the outcome, schedule cleanup.

use crate::config::{EnvConfig, GenerationDefaults};
use crate::error::{CompletionError, Result};
use crate::llm::{CompletionBackend, CompletionParams};
use crate::mcp::requests::CompletionRequest;
use crate::tasks::{CompletionResult, CompletionTask, TaskRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Error message recorded on a task cancelled through `cancel_task`
pub const CANCELLED_BY_USER: &str = "Task cancelled by user";

/// Process-wide settings the orchestrator applies to every task
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Model id sent upstream; never caller-supplied
    pub model: String,
    /// Deadline for the outbound call, and the post-completion grace period
    pub timeout: Duration,
    pub defaults: GenerationDefaults,
}

impl OrchestratorConfig {
    pub fn new(model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model: model.into(),
            timeout,
            defaults: GenerationDefaults::default(),
        }
    }

    pub fn from_env(env: &EnvConfig) -> Self {
        Self::new(env.model.clone(), env.timeout)
    }
}

/// Owns the task lifecycle. Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct CompletionOrchestrator {
    registry: TaskRegistry,
    backend: Arc<dyn CompletionBackend>,
    config: Arc<OrchestratorConfig>,
}

impl CompletionOrchestrator {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        registry: TaskRegistry,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            backend,
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Fresh task identifier
    pub fn new_task_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Snapshot of a task, while it is still retained
    pub fn task(&self, id: &str) -> Option<CompletionTask> {
        self.registry.get(id)
    }

    /// Resolve the outbound request, filling omitted fields from the defaults
    pub fn build_params(&self, request: &CompletionRequest) -> CompletionParams {
        let defaults = &self.config.defaults;
        CompletionParams {
            model: self.config.model.clone(),
            prompt: request.prompt.clone(),
            max_tokens: request
                .max_tokens
                .clone()
                .unwrap_or_else(|| defaults.max_tokens.into()),
            temperature: request.temperature.unwrap_or(defaults.temperature),
            top_p: request.top_p.unwrap_or(defaults.top_p),
            frequency_penalty: request
                .frequency_penalty
                .unwrap_or(defaults.frequency_penalty),
            presence_penalty: request
                .presence_penalty
                .unwrap_or(defaults.presence_penalty),
        }
    }

    /// Run a completion under a freshly generated task id
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResult> {
        let id = Self::new_task_id();
        self.complete_task(&id, request).await
    }

    /// Run a completion under a caller-chosen task id.
    ///
    /// The task is driven on its own tokio task, so it reaches a terminal
    /// state and gets its expiry scheduled even if this future is dropped.
    pub async fn complete_task(&self, id: &str, request: CompletionRequest) -> Result<CompletionResult> {
        let task = CompletionTask::new(id, self.config.timeout);
        let signal = task.cancel_signal();
        let deadline = Instant::now() + self.config.timeout;

        if !self.registry.create(task) {
            return Err(CompletionError::DuplicateTask(id.to_string()));
        }
        debug!(task_id = %id, timeout_ms = self.config.timeout.as_millis() as u64, "Created completion task");

        let this = self.clone();
        let task_id = id.to_string();
        let supervisor = tokio::spawn(async move {
            let driver = {
                let this = this.clone();
                let task_id = task_id.clone();
                tokio::spawn(async move { this.drive(task_id, request, signal, deadline).await })
            };
            match driver.await {
                Ok(outcome) => outcome,
                Err(join_err) => Err(this.settle_crashed(&task_id, join_err)),
            }
        });

        supervisor.await.map_err(CompletionError::from)?
    }

    /// The driver died before recording an outcome: fail the task and still
    /// schedule its expiry.
    fn settle_crashed(&self, id: &str, join_err: tokio::task::JoinError) -> CompletionError {
        let err = CompletionError::from(join_err);
        self.registry.update_if_active(id, |task| {
            task.trigger_cancel();
            task.fail(err.to_string())
        });
        self.registry.schedule_expiry(id, self.config.timeout);
        error!(task_id = %id, error = %err, "Completion driver crashed");
        err
    }

    async fn drive(
        &self,
        id: String,
        request: CompletionRequest,
        signal: CancellationToken,
        deadline: Instant,
    ) -> Result<CompletionResult> {
        let params = self.build_params(&request);

        if self.registry.update_if_active(&id, CompletionTask::start_processing) {
            debug!(task_id = %id, model = %params.model, "Task processing");
        }

        let outcome = self.race(&id, params, signal, deadline).await;

        // Every settled path ends here exactly once; a panic goes through settle_crashed
        self.registry.schedule_expiry(&id, self.config.timeout);
        outcome
    }

    async fn race(
        &self,
        id: &str,
        params: CompletionParams,
        signal: CancellationToken,
        deadline: Instant,
    ) -> Result<CompletionResult> {
        let start = std::time::Instant::now();

        let settled = tokio::select! {
            result = self.backend.create_completion(params, signal.clone()) => Some(result),
            _ = tokio::time::sleep_until(deadline) => None,
        };

        match settled {
            Some(Ok(response)) => {
                let result = CompletionResult {
                    text: response.first_text(),
                    model: self.config.model.clone(),
                    finish_reason: response.first_finish_reason(),
                    usage: response.usage,
                };

                if !self
                    .registry
                    .update_if_active(id, |task| task.complete(result.clone()))
                {
                    // Cancelled between settlement and bookkeeping; the task already says so
                    warn!(task_id = %id, "Discarding completion for task that is no longer active");
                    return Err(CompletionError::Cancelled);
                }

                info!(
                    task_id = %id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    finish_reason = ?result.finish_reason,
                    "Completion finished"
                );
                Ok(result)
            }
            Some(Err(err)) => {
                let aborted = signal.is_cancelled();
                let message = err.to_string();
                self.registry
                    .update_if_active(id, |task| task.fail(message.clone()));

                let err = CompletionError::from_upstream(err, aborted);
                warn!(task_id = %id, error = %err, "Completion failed");
                Err(err)
            }
            None => {
                // The losing call is dropped with this branch; also fire the
                // handle so anything else observing the signal stops too.
                self.registry.update_if_active(id, |task| {
                    task.trigger_cancel();
                    task.fail(CompletionError::Timeout.to_string())
                });
                warn!(
                    task_id = %id,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "Completion timed out"
                );
                Err(CompletionError::Timeout)
            }
        }
    }

    /// Cancel a Pending or Processing task.
    ///
    /// Fires the task's cancellation handle and records the task as Error.
    /// Returns false if the task is unknown or already terminal.
    pub fn cancel_task(&self, id: &str) -> bool {
        let cancelled = self.registry.update_if_active(id, |task| {
            task.trigger_cancel();
            task.fail(CANCELLED_BY_USER)
        });
        if cancelled {
            info!(task_id = %id, "Task cancelled by user");
        } else {
            debug!(task_id = %id, "Cancel ignored: task absent or finished");
        }
        cancelled
    }
}
