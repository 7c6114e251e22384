//! Configuration for the upload service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upload storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Background processing configuration
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// Task registry configuration
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file. Missing sections and fields fall
    /// back to their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.max_upload_size == 0 {
            return Err(Error::Config("server.max_upload_size must be > 0".to_string()));
        }
        if self.processing.queue_capacity == 0 {
            return Err(Error::Config("processing.queue_capacity must be > 0".to_string()));
        }
        if self.processing.worker_count == Some(0) {
            return Err(Error::Config("processing.worker_count must be > 0".to_string()));
        }
        if self.processing.accepted_extensions.is_empty() {
            return Err(Error::Config(
                "processing.accepted_extensions must not be empty".to_string(),
            ));
        }
        if self.storage.result_suffix.is_empty() {
            return Err(Error::Config("storage.result_suffix must not be empty".to_string()));
        }
        if self.registry.sweep_interval_secs == 0 {
            return Err(Error::Config("registry.sweep_interval_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum accepted upload size in bytes (default: 10MB)
    pub max_upload_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Upload storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory uploaded files are written to
    pub upload_dir: PathBuf,
    /// Suffix appended to the input path to name the result artifact
    pub result_suffix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("saved_files"),
            result_suffix: "_result.txt".to_string(),
        }
    }
}

/// Background processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Filename suffixes the processor accepts (case-sensitive)
    pub accepted_extensions: Vec<String>,
    /// Fixed latency step before the result is written, in milliseconds
    pub processing_delay_ms: u64,
    /// Number of workers (default: CPU count, max 4)
    pub worker_count: Option<usize>,
    /// Maximum number of jobs waiting for a worker
    pub queue_capacity: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            accepted_extensions: vec![".txt".to_string(), ".csv".to_string()],
            processing_delay_ms: 5000,
            worker_count: None, // Auto-detect from CPU count
            queue_capacity: 1024,
        }
    }
}

impl ProcessingConfig {
    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    /// Resolved worker count
    pub fn workers(&self) -> usize {
        self.worker_count
            .unwrap_or_else(|| num_cpus::get().min(4))
            .max(1)
    }
}

/// Task registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Remove completed/failed tasks older than this. `None` keeps every
    /// task for the lifetime of the process.
    pub task_ttl_secs: Option<u64>,
    /// How often the expiry sweep runs when a TTL is set
    pub sweep_interval_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            task_ttl_secs: None,
            sweep_interval_secs: 60,
        }
    }
}

impl RegistryConfig {
    pub fn task_ttl(&self) -> Option<Duration> {
        self.task_ttl_secs.map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
