//! API routes for the upload server

pub mod status;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build all API routes
pub fn api_routes(max_upload_size: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        // Upload, with and without the trailing slash
        .route(
            "/upload/",
            post(upload::upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/upload",
            post(upload::upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        // Task status
        .route("/status/:task_id", get(status::get_status))
        .route("/tasks", get(status::list_tasks))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "upload-tasks",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "File upload service with background processing and pollable task status",
        "endpoints": {
            "POST /upload/": "Upload a file and start processing",
            "GET /status/:task_id": "Get task status",
            "GET /tasks": "List all tasks and queue stats",
            "GET /health": "Liveness check",
            "GET /ready": "Readiness check",
            "GET /info": "This document"
        }
    }))
}
