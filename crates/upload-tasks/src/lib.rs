//! upload-tasks: HTTP file upload service with background processing
//!
//! Clients upload a file, get a task id back immediately, and poll the task
//! status while a worker pool processes the file and writes a result artifact
//! next to it.

pub mod config;
pub mod error;
pub mod processing;
pub mod server;
pub mod storage;
pub mod types;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use processing::{FileProcessor, TaskRegistry};
pub use server::UploadServer;
pub use types::{ErrorKind, Task, TaskId, TaskState, TaskStatus};
