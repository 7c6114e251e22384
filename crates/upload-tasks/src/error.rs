//! Error types for the upload service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::types::{TaskId, TaskStatus};

/// Result type alias for upload service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Upload service errors
///
/// Processing failures are not represented here: they are recorded on the
/// task itself (see [`crate::types::ErrorKind`]) and never returned to a caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upload exceeds the configured size limit
    #[error("File is too large")]
    TooLarge { declared: u64, limit: u64 },

    /// Malformed upload request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Processing queue has no free slot
    #[error("Processing queue is full, retry later")]
    QueueFull,

    /// Unknown task identifier
    #[error("Task with ID {0} not found")]
    TaskNotFound(String),

    /// Registry already holds this identifier
    #[error("Task {0} already exists")]
    DuplicateTask(TaskId),

    /// Transition rejected by the task state machine
    #[error("Task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a not-found error for a raw task identifier
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::TaskNotFound(id.into())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::TooLarge { .. } => (StatusCode::BAD_REQUEST, "too_large"),
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::QueueFull => (StatusCode::SERVICE_UNAVAILABLE, "queue_full"),
            Error::TaskNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::DuplicateTask(_) | Error::InvalidTransition { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "registry_error")
            }
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let too_large = Error::TooLarge {
            declared: 20,
            limit: 10,
        };
        assert_eq!(too_large.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::task_not_found("abc").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::QueueFull.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_messages_match_api_contract() {
        let too_large = Error::TooLarge {
            declared: 20,
            limit: 10,
        };
        assert_eq!(too_large.to_string(), "File is too large");
        assert_eq!(
            Error::task_not_found("abc").to_string(),
            "Task with ID abc not found"
        );
    }
}
