//! Task state storage

use crate::error::JobError;
use async_trait::async_trait;
use sift_domain::{now_millis, ExtractionTask, TaskUpdate};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Where extraction task state lives while jobs run and are polled
///
/// `merge` must apply the update atomically with respect to other writers,
/// so concurrent partial updates all follow [`ExtractionTask::apply`].
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Current state of a task
    async fn get(&self, task_id: &str) -> Result<Option<ExtractionTask>, JobError>;

    /// Insert or replace a task
    async fn set(&self, task: ExtractionTask) -> Result<(), JobError>;

    /// Merge a partial update; `false` when the task does not exist
    async fn merge(&self, task_id: &str, update: TaskUpdate) -> Result<bool, JobError>;

    /// Forget a task; `false` when it did not exist
    async fn remove(&self, task_id: &str) -> Result<bool, JobError>;
}

/// Process-local task store
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<String, ExtractionTask>>,
}

impl InMemoryTaskStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks held
    pub fn len(&self) -> usize {
        lock(&self.tasks).len()
    }

    /// Whether no tasks are held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, task_id: &str) -> Result<Option<ExtractionTask>, JobError> {
        Ok(lock(&self.tasks).get(task_id).cloned())
    }

    async fn set(&self, task: ExtractionTask) -> Result<(), JobError> {
        lock(&self.tasks).insert(task.id.clone(), task);
        Ok(())
    }

    async fn merge(&self, task_id: &str, update: TaskUpdate) -> Result<bool, JobError> {
        let mut tasks = lock(&self.tasks);
        match tasks.get_mut(task_id) {
            Some(task) => {
                task.apply(update, now_millis());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, task_id: &str) -> Result<bool, JobError> {
        Ok(lock(&self.tasks).remove(task_id).is_some())
    }
}
