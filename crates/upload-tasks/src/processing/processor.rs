//! File processor: validation, character counting and result artifacts

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::Result;
use crate::types::{ErrorKind, Task, TaskId, TaskState};

use super::registry::TaskRegistry;

/// Failure of one processing step, recorded on the task as `failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ProcessingError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unsupported_format() -> Self {
        Self::new(ErrorKind::UnsupportedFormat, "Unsupported file format")
    }

    fn read_failed(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::new(
                ErrorKind::FileNotFound,
                format!("File not found: {}: {}", path.display(), err),
            ),
            _ => Self::new(ErrorKind::GeneralError, err.to_string()),
        }
    }

    /// Terminal state for this failure
    pub fn into_state(self) -> TaskState {
        TaskState::failed(self.kind, self.message)
    }
}

impl std::fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ProcessingError {}

/// Lengths of the lines in `content`, terminators included.
///
/// A `\r\n` pair counts as one terminator character.
pub fn line_lengths(content: &str) -> impl Iterator<Item = usize> + '_ {
    content.split_inclusive('\n').map(|line| {
        let chars = line.chars().count();
        if line.ends_with("\r\n") {
            chars - 1
        } else {
            chars
        }
    })
}

/// Total characters across all lines
pub fn count_characters(content: &str) -> usize {
    line_lengths(content).sum()
}

/// Performs the work for one task and records the outcome
#[derive(Debug, Clone)]
pub struct FileProcessor {
    accepted_extensions: Vec<String>,
    delay: Duration,
    result_suffix: String,
}

impl FileProcessor {
    pub fn new(
        accepted_extensions: Vec<String>,
        delay: Duration,
        result_suffix: impl Into<String>,
    ) -> Self {
        Self {
            accepted_extensions,
            delay,
            result_suffix: result_suffix.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.processing.accepted_extensions.clone(),
            config.processing.processing_delay(),
            config.storage.result_suffix.clone(),
        )
    }

    /// Whether the file name ends in an accepted extension
    pub fn is_supported(&self, path: &Path) -> bool {
        let name = path.to_string_lossy();
        self.accepted_extensions
            .iter()
            .any(|ext| name.ends_with(ext.as_str()))
    }

    /// `<path><suffix>`, next to the input file
    pub fn result_path(&self, path: &Path) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(&self.result_suffix);
        PathBuf::from(name)
    }

    /// Validate, count, wait, and write the result artifact.
    ///
    /// Returns the artifact path.
    pub async fn process(&self, path: &Path) -> std::result::Result<PathBuf, ProcessingError> {
        if !self.is_supported(path) {
            return Err(ProcessingError::unsupported_format());
        }

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| ProcessingError::read_failed(path, e))?;
        let content = String::from_utf8(data).map_err(|e| {
            ProcessingError::new(
                ErrorKind::GeneralError,
                format!("File is not valid UTF-8 text: {}", e),
            )
        })?;

        let total = count_characters(&content);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result_path = self.result_path(path);
        tokio::fs::write(
            &result_path,
            format!("File processed. Total characters: {}\n", total),
        )
        .await
        .map_err(|e| {
            ProcessingError::new(
                ErrorKind::GeneralError,
                format!("Failed to write {}: {}", result_path.display(), e),
            )
        })?;

        Ok(result_path)
    }

    /// Drive one task through `processing` to a terminal state.
    ///
    /// Processing failures end up in the registry; the returned error only
    /// covers registry contract violations.
    pub async fn run(&self, registry: &TaskRegistry, id: TaskId, path: &Path) -> Result<Task> {
        registry.update(id, TaskState::Processing)?;
        tracing::info!(task_id = %id, path = %path.display(), "Processing started");

        let state = match self.process(path).await {
            Ok(result_path) => {
                tracing::info!(
                    task_id = %id,
                    result = %result_path.display(),
                    "Processing completed"
                );
                TaskState::completed(result_path)
            }
            Err(e) => {
                tracing::error!(task_id = %id, kind = %e.kind, "Processing failed: {}", e.message);
                e.into_state()
            }
        };

        registry.update(id, state)
    }
}
