//! Core types for the upload service

pub mod response;
pub mod task;

pub use response::{StatusResponse, TaskListResponse, UploadResponse};
pub use task::{ErrorKind, Task, TaskId, TaskState, TaskStatus};
