//! Task registry: the single source of truth for task state
//!
//! Entries are guarded per shard by the concurrent map, so a status read never
//! observes a task halfway through a transition.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{Task, TaskId, TaskState, TaskStatus};

/// Process-wide map from task identifier to task state
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: DashMap<TaskId, Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
        }
    }

    /// Insert a new `queued` task. The entry is visible to readers once this
    /// returns.
    pub fn create(&self, id: TaskId, filename: impl Into<PathBuf>) -> Result<Task> {
        match self.tasks.entry(id) {
            Entry::Occupied(_) => Err(Error::DuplicateTask(id)),
            Entry::Vacant(slot) => {
                let task = Task::new(id, filename);
                slot.insert(task.clone());
                tracing::debug!(task_id = %id, "Task queued");
                Ok(task)
            }
        }
    }

    /// Move a task to `state`, enforcing the task state machine.
    ///
    /// The state and its payload are replaced together under the entry lock.
    pub fn update(&self, id: TaskId, state: TaskState) -> Result<Task> {
        let mut task = self
            .tasks
            .get_mut(&id)
            .ok_or_else(|| Error::task_not_found(id.to_string()))?;

        let from = task.status();
        let to = state.status();
        if !from.can_transition_to(to) {
            tracing::warn!(task_id = %id, %from, %to, "Rejected task transition");
            return Err(Error::InvalidTransition { id, from, to });
        }

        task.state = state;
        task.updated_at = Utc::now();
        tracing::debug!(task_id = %id, %from, %to, "Task transitioned");
        Ok(task.clone())
    }

    /// Snapshot of a task
    pub fn get(&self, id: &TaskId) -> Result<Task> {
        self.tasks
            .get(id)
            .map(|task| task.clone())
            .ok_or_else(|| Error::task_not_found(id.to_string()))
    }

    /// All tasks, oldest first
    pub fn list(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.iter().map(|e| e.value().clone()).collect();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task counts per status
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        for entry in self.tasks.iter() {
            stats.total_tasks += 1;
            match entry.status() {
                TaskStatus::Queued => stats.queued += 1,
                TaskStatus::Processing => stats.processing += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Remove completed/failed tasks whose last update is at least `ttl` old.
    /// Queued and processing tasks are never removed.
    ///
    /// Returns the number of tasks removed.
    pub fn purge_terminal(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let now = Utc::now();
        let mut removed = 0;

        self.tasks.retain(|_, task| {
            let expired = task.is_terminal() && now - task.updated_at >= ttl;
            if expired {
                removed += 1;
            }
            !expired
        });

        if removed > 0 {
            tracing::info!("Purged {} expired tasks", removed);
        }
        removed
    }
}

/// Registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total_tasks: usize,
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}
