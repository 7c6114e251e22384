//! API response bodies

use serde::{Deserialize, Serialize};

use super::task::{Task, TaskId};

/// Message returned for every accepted upload
pub const UPLOAD_ACCEPTED_MESSAGE: &str = "File uploaded successfully, processing started.";

/// Response from `POST /upload/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub task_id: TaskId,
    pub message: String,
}

impl UploadResponse {
    pub fn accepted(task_id: TaskId) -> Self {
        Self {
            task_id,
            message: UPLOAD_ACCEPTED_MESSAGE.to_string(),
        }
    }
}

/// Response from `GET /status/{task_id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub task_id: TaskId,
    pub status: Task,
}

/// Response from `GET /tasks`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
    pub total_tasks: usize,
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub worker_count: usize,
}
