//! Task status endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{StatusResponse, TaskId, TaskListResponse};

/// GET /status/:task_id - Current snapshot of one task
pub async fn get_status(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<StatusResponse>> {
    // Anything that is not a UUID cannot name a task
    let task_id: TaskId = raw_id
        .parse()
        .map_err(|_| Error::task_not_found(raw_id.as_str()))?;

    let task = state.registry().get(&task_id)?;
    Ok(Json(StatusResponse {
        task_id,
        status: task,
    }))
}

/// GET /tasks - All tasks with per-status counts
pub async fn list_tasks(State(state): State<AppState>) -> Json<TaskListResponse> {
    let tasks = state.registry().list();
    let stats = state.registry().stats();

    Json(TaskListResponse {
        tasks,
        total_tasks: stats.total_tasks,
        queued: stats.queued,
        processing: stats.processing,
        completed: stats.completed,
        failed: stats.failed,
        worker_count: state.worker_count(),
    })
}
