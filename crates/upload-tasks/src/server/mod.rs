//! HTTP server for uploads and task status

pub mod routes;
pub mod state;

use axum::{http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Upload HTTP server
pub struct UploadServer {
    config: AppConfig,
    state: AppState,
}

impl UploadServer {
    /// Create a new server and start its background workers
    pub async fn new(config: AppConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            // Health check
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .merge(routes::api_routes(self.config.server.max_upload_size))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.server.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router.layer(cors)
        } else {
            router
        }
    }

    /// Start the server and serve until Ctrl+C
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();

        tracing::info!("Starting upload server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal(self.state.clone()))
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested, draining connections");
    state.set_ready(false);
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness(state: axum::extract::State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StatusResponse, TaskListResponse, TaskState, TaskStatus, UploadResponse};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, Response};
    use std::path::Path;
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "upload-tasks-test-boundary";

    async fn test_server(upload_dir: &Path, max_upload_size: u64) -> UploadServer {
        let mut config = AppConfig::default();
        config.storage.upload_dir = upload_dir.to_path_buf();
        config.server.max_upload_size = max_upload_size;
        config.processing.processing_delay_ms = 50;
        config.processing.worker_count = Some(2);
        UploadServer::new(config).await.unwrap()
    }

    fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(filename: &str, content: &[u8], with_length: bool) -> Request<Body> {
        let body = multipart_body(filename, content);
        let mut builder = Request::builder()
            .method("POST")
            .uri("/upload/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if with_length {
            builder = builder.header(header::CONTENT_LENGTH, body.len());
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response<Body>) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn upload(router: &Router, filename: &str, content: &[u8]) -> UploadResponse {
        let response = router
            .clone()
            .oneshot(upload_request(filename, content, true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        json(response).await
    }

    async fn status(router: &Router, id: impl std::fmt::Display) -> Response<Body> {
        router
            .clone()
            .oneshot(get(&format!("/status/{}", id)))
            .await
            .unwrap()
    }

    async fn wait_for_terminal(router: &Router, id: impl std::fmt::Display) -> StatusResponse {
        for _ in 0..300 {
            let body: StatusResponse = json(status(router, &id).await).await;
            if body.status.is_terminal() {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("task {} never finished", id);
    }

    #[tokio::test]
    async fn test_upload_then_poll_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), 10 * 1024 * 1024).await;
        let router = server.build_router();

        let accepted = upload(&router, "data.csv", b"abcd\nefghij\n").await;
        assert_eq!(
            accepted.message,
            "File uploaded successfully, processing started."
        );

        // Visible immediately, whatever stage the worker has reached
        let first: StatusResponse = json(status(&router, accepted.task_id).await).await;
        assert_eq!(first.task_id, accepted.task_id);

        let done = wait_for_terminal(&router, accepted.task_id).await;
        let expected = dir.path().join("data.csv_result.txt");
        assert_eq!(done.status.state, TaskState::completed(&expected));
        assert_eq!(
            std::fs::read_to_string(&expected).unwrap(),
            "File processed. Total characters: 12\n"
        );

        // Terminal reads are stable
        let again: StatusResponse = json(status(&router, accepted.task_id).await).await;
        assert_eq!(again, done);
    }

    #[tokio::test]
    async fn test_status_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), 1024).await;
        let router = server.build_router();

        let accepted = upload(&router, "notes.txt", b"hi\n").await;
        wait_for_terminal(&router, accepted.task_id).await;

        let body: serde_json::Value = json(status(&router, accepted.task_id).await).await;
        assert_eq!(body["task_id"], accepted.task_id.to_string());
        assert_eq!(body["status"]["status"], "completed");
        assert!(body["status"]["result_reference"]
            .as_str()
            .unwrap()
            .ends_with("notes.txt_result.txt"));
    }

    #[tokio::test]
    async fn test_unsupported_format_fails_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), 1024).await;
        let router = server.build_router();

        let accepted = upload(&router, "image.png", b"\x89PNG").await;
        let done = wait_for_terminal(&router, accepted.task_id).await;

        assert_eq!(done.status.status(), TaskStatus::Failed);
        let body = serde_json::to_value(&done.status).unwrap();
        assert_eq!(body["error_kind"], "UnsupportedFormat");
        assert!(!dir.path().join("image.png_result.txt").exists());
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), 1024).await;
        let router = server.build_router();

        let missing = crate::types::TaskId::new();
        let response = status(&router, missing).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = json(response).await;
        assert_eq!(
            body["error"]["message"],
            format!("Task with ID {} not found", missing)
        );

        let response = status(&router, "not-a-uuid").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_declared_too_large_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), 64).await;
        let router = server.build_router();

        let response = router
            .clone()
            .oneshot(upload_request("big.txt", &[b'x'; 256], true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = json(response).await;
        assert_eq!(body["error"]["message"], "File is too large");

        assert!(server.state().registry().is_empty());
        assert!(!dir.path().join("big.txt").exists());
    }

    #[tokio::test]
    async fn test_streamed_too_large_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), 64).await;
        let router = server.build_router();

        // No Content-Length: the limit trips while streaming
        let response = router
            .clone()
            .oneshot(upload_request("big.txt", &[b'x'; 256], false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert!(server.state().registry().is_empty());
        assert!(!dir.path().join("big.txt").exists());
    }

    #[tokio::test]
    async fn test_filename_directories_are_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), 1024).await;
        let router = server.build_router();

        let accepted = upload(&router, "../../outside.txt", b"x\n").await;
        let done = wait_for_terminal(&router, accepted.task_id).await;

        assert_eq!(done.status.filename, dir.path().join("outside.txt"));
        assert!(dir.path().join("outside.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_file_part_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), 1024).await;
        let router = server.build_router();

        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(server.state().registry().is_empty());
    }

    #[tokio::test]
    async fn test_full_queue_rejects_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.upload_dir = dir.path().to_path_buf();
        config.processing.processing_delay_ms = 10_000;
        config.processing.worker_count = Some(1);
        config.processing.queue_capacity = 1;
        let server = UploadServer::new(config).await.unwrap();
        let router = server.build_router();

        // One job in the worker plus one waiting is the most that fits
        let mut accepted = 0;
        let mut rejected = 0;
        for i in 0..3 {
            let response = router
                .clone()
                .oneshot(upload_request(&format!("f{}.txt", i), b"x\n", true))
                .await
                .unwrap();
            match response.status() {
                StatusCode::OK => accepted += 1,
                StatusCode::SERVICE_UNAVAILABLE => rejected += 1,
                other => panic!("unexpected status {}", other),
            }
        }

        assert!(rejected >= 1);
        assert_eq!(server.state().registry().len(), accepted);
    }

    #[tokio::test]
    async fn test_task_listing() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), 1024).await;
        let router = server.build_router();

        let a = upload(&router, "a.txt", b"1\n").await;
        let b = upload(&router, "b.pdf", b"2\n").await;
        wait_for_terminal(&router, a.task_id).await;
        wait_for_terminal(&router, b.task_id).await;

        let listing: TaskListResponse =
            json(router.clone().oneshot(get("/tasks")).await.unwrap()).await;
        assert_eq!(listing.total_tasks, 2);
        assert_eq!(listing.completed, 1);
        assert_eq!(listing.failed, 1);
        assert_eq!(listing.worker_count, 2);
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), 1024).await;
        let router = server.build_router();

        let response = router.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router.clone().oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        server.state().set_ready(false);
        let response = router.clone().oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
