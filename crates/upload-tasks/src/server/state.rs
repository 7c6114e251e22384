//! Application state for the upload server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::processing::{spawn_expiry_sweeper, FileProcessor, TaskQueue, TaskRegistry, WorkerPool};
use crate::storage::UploadStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: AppConfig,
    /// Task registry
    registry: Arc<TaskRegistry>,
    /// Upload directory
    store: UploadStore,
    /// Queue feeding the worker pool
    queue: TaskQueue,
    /// Number of processing workers
    worker_count: usize,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create state, the upload directory and the background workers.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let store = UploadStore::from_config(&config);
        store.ensure_dir().await?;
        tracing::info!("Uploads stored in {}", store.upload_dir().display());

        let registry = Arc::new(TaskRegistry::new());
        let processor = Arc::new(FileProcessor::from_config(&config));

        let pool = WorkerPool::new(
            Arc::clone(&registry),
            processor,
            config.processing.workers(),
        );
        let worker_count = pool.worker_count();
        let (queue, _workers) = pool.start(config.processing.queue_capacity);

        if let Some(ttl) = config.registry.task_ttl() {
            spawn_expiry_sweeper(
                Arc::clone(&registry),
                ttl,
                config.registry.sweep_interval(),
            );
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                registry,
                store,
                queue,
                worker_count,
                ready: RwLock::new(true),
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.inner.registry
    }

    pub fn store(&self) -> &UploadStore {
        &self.inner.store
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.inner.queue
    }

    pub fn worker_count(&self) -> usize {
        self.inner.worker_count
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
