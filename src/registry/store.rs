use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::error::{RegistryError, Result};
use super::state::{Task, TaskStatus};

/// Concurrency-safe map from task id to [`Task`]
///
/// Cloning is cheap; clones share the same underlying map.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<RwLock<HashMap<String, Task>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id and record it as `Processing`
    pub async fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.tasks
            .write()
            .await
            .insert(id.clone(), Task::new(id.clone()));
        debug!(task_id = %id, "Task created");
        id
    }

    /// Move a task to `status`, enforcing the lifecycle
    pub async fn set(&self, id: &str, status: TaskStatus) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownTask(id.to_string()))?;

        if !task.status.can_transition_to(&status) {
            return Err(RegistryError::transition(id, &task.status, &status));
        }

        debug!(task_id = %id, from = task.status.label(), to = status.label(), "Task transition");
        task.status = status;
        task.updated_at = Utc::now();
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Task> {
        self.tasks.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.tasks.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}
