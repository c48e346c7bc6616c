// src/tasks/registry.rs
// Task registry: id -> CompletionTask, with time-driven expiry

use super::CompletionTask;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Shared, explicitly owned map of in-flight and recently finished tasks.
///
/// Cloning shares the same map. Readers get snapshot copies; all mutation
/// goes through `update`/`update_if_active`.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<Mutex<HashMap<String, CompletionTask>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CompletionTask>> {
        // No invariant spans a panic inside the critical sections below
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new task. Returns false (and leaves the map alone) if the id is taken.
    pub fn create(&self, task: CompletionTask) -> bool {
        let mut tasks = self.lock();
        if tasks.contains_key(&task.id) {
            return false;
        }
        tasks.insert(task.id.clone(), task);
        true
    }

    /// Snapshot of a task
    pub fn get(&self, id: &str) -> Option<CompletionTask> {
        self.lock().get(id).cloned()
    }

    /// Apply `f` to the task. Returns None when the id is unknown.
    pub fn update<F, R>(&self, id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut CompletionTask) -> R,
    {
        self.lock().get_mut(id).map(f)
    }

    /// Apply `f` only while the task is not terminal.
    ///
    /// Late settlements (the loser of the completion/timeout race) land here
    /// and are dropped. Returns false if the task is absent or terminal.
    pub fn update_if_active<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut CompletionTask) -> bool,
    {
        match self.lock().get_mut(id) {
            Some(task) if !task.is_terminal() => f(task),
            _ => false,
        }
    }

    /// Remove a task, returning it
    pub fn expire(&self, id: &str) -> Option<CompletionTask> {
        let removed = self.lock().remove(id);
        if removed.is_some() {
            debug!(task_id = %id, "Expired task");
        }
        removed
    }

    /// Remove the task once `grace` has elapsed.
    ///
    /// Must be called from within a tokio runtime. The removal never happens
    /// before `grace`; it may happen slightly after.
    pub fn schedule_expiry(&self, id: &str, grace: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            registry.expire(&id);
        })
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Snapshots of every retained task, oldest first
    pub fn snapshot(&self) -> Vec<CompletionTask> {
        let mut tasks: Vec<CompletionTask> = self.lock().values().cloned().collect();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskStatus;

    const TIMEOUT: Duration = Duration::from_secs(60);

    #[test]
    fn test_create_and_get() {
        let registry = TaskRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.create(CompletionTask::new("a", TIMEOUT)));
        assert_eq!(registry.len(), 1);

        let task = registry.get("a").unwrap();
        assert_eq!(task.id, "a");
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(registry.get("b").is_none());
    }

    #[test]
    fn test_create_rejects_duplicate_id() {
        let registry = TaskRegistry::new();
        assert!(registry.create(CompletionTask::new("a", TIMEOUT)));
        registry.update("a", |t| t.start_processing());
        assert!(!registry.create(CompletionTask::new("a", TIMEOUT)));
        assert_eq!(registry.get("a").unwrap().status, TaskStatus::Processing);
    }

    #[test]
    fn test_snapshot_does_not_alias() {
        let registry = TaskRegistry::new();
        registry.create(CompletionTask::new("a", TIMEOUT));
        let mut snapshot = registry.get("a").unwrap();
        snapshot.fail("local only");
        assert_eq!(registry.get("a").unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn test_update_unknown_id() {
        let registry = TaskRegistry::new();
        assert!(registry.update("missing", |t| t.start_processing()).is_none());
        assert!(!registry.update_if_active("missing", |t| t.start_processing()));
    }

    #[test]
    fn test_update_if_active_skips_terminal() {
        let registry = TaskRegistry::new();
        registry.create(CompletionTask::new("a", TIMEOUT));
        assert!(registry.update_if_active("a", |t| t.fail("boom")));

        let mut called = false;
        assert!(!registry.update_if_active("a", |_| {
            called = true;
            true
        }));
        assert!(!called);
        assert_eq!(registry.get("a").unwrap().error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_expire() {
        let registry = TaskRegistry::new();
        registry.create(CompletionTask::new("a", TIMEOUT));
        assert!(registry.expire("a").is_some());
        assert!(registry.expire("a").is_none());
        assert!(!registry.contains("a"));
    }

    #[test]
    fn test_clones_share_state() {
        let registry = TaskRegistry::new();
        let other = registry.clone();
        registry.create(CompletionTask::new("a", TIMEOUT));
        assert!(other.contains("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_expiry_respects_grace() {
        let registry = TaskRegistry::new();
        registry.create(CompletionTask::new("a", TIMEOUT));
        let handle = registry.schedule_expiry("a", Duration::from_secs(10));

        tokio::time::sleep(Duration::from_millis(9_999)).await;
        assert!(registry.contains("a"));

        handle.await.unwrap();
        assert!(!registry.contains("a"));
    }
}
