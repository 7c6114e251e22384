//! Bounded processing queue and worker pool

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError, OwnedPermit};
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinHandle};

use crate::error::{Error, Result};
use crate::types::{ErrorKind, TaskId, TaskState};

use super::processor::FileProcessor;
use super::registry::TaskRegistry;

/// One unit of background work
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    pub task_id: TaskId,
    pub path: PathBuf,
}

/// Sending half of the processing queue
#[derive(Debug, Clone)]
pub struct TaskQueue {
    sender: mpsc::Sender<ProcessingJob>,
    capacity: usize,
}

impl TaskQueue {
    /// Reserve a queue slot without waiting.
    ///
    /// Fails with `QueueFull` when every slot is taken.
    pub fn reserve(&self) -> Result<QueueSlot> {
        match self.sender.clone().try_reserve_owned() {
            Ok(permit) => Ok(QueueSlot { permit }),
            Err(TrySendError::Full(_)) => Err(Error::QueueFull),
            Err(TrySendError::Closed(_)) => {
                Err(Error::internal("Processing queue is closed"))
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A reserved queue slot. Dropping it without submitting releases the slot.
#[derive(Debug)]
pub struct QueueSlot {
    permit: OwnedPermit<ProcessingJob>,
}

impl QueueSlot {
    pub fn submit(self, job: ProcessingJob) {
        self.permit.send(job);
    }
}

/// Fixed pool of workers draining the queue
pub struct WorkerPool {
    registry: Arc<TaskRegistry>,
    processor: Arc<FileProcessor>,
    worker_count: usize,
}

impl WorkerPool {
    pub fn new(
        registry: Arc<TaskRegistry>,
        processor: Arc<FileProcessor>,
        worker_count: usize,
    ) -> Self {
        Self {
            registry,
            processor,
            worker_count: worker_count.max(1),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Spawn the workers and return the queue feeding them.
    ///
    /// Workers exit once every `TaskQueue` clone is dropped and the queue
    /// is drained.
    pub fn start(self, capacity: usize) -> (TaskQueue, Vec<JoinHandle<()>>) {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        tracing::info!(
            "Starting {} processing workers (queue capacity {})",
            self.worker_count,
            capacity
        );

        let handles = (0..self.worker_count)
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let registry = Arc::clone(&self.registry);
                let processor = Arc::clone(&self.processor);
                tokio::spawn(run_worker(worker_id, receiver, registry, processor))
            })
            .collect();

        (TaskQueue { sender, capacity }, handles)
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<ProcessingJob>>>,
    registry: Arc<TaskRegistry>,
    processor: Arc<FileProcessor>,
) {
    tracing::debug!(worker_id, "Worker started");

    loop {
        let job = receiver.lock().await.recv().await;
        let Some(ProcessingJob { task_id, path }) = job else {
            break;
        };

        // Run each job in its own task so a panic only takes down that job
        let handle = {
            let registry = Arc::clone(&registry);
            let processor = Arc::clone(&processor);
            tokio::spawn(async move { processor.run(&registry, task_id, &path).await })
        };

        match handle.await {
            Ok(Ok(task)) => {
                tracing::debug!(worker_id, task_id = %task_id, status = %task.status(), "Job finished");
            }
            Ok(Err(e)) => {
                tracing::error!(worker_id, task_id = %task_id, "Job could not be recorded: {}", e);
            }
            Err(e) => {
                tracing::error!(worker_id, task_id = %task_id, "Job panicked: {}", e);
                record_abort(&registry, task_id, e);
            }
        }
    }

    tracing::debug!(worker_id, "Worker stopped");
}

/// Mark a task whose job died without reporting back as failed.
///
/// A task that already reached a terminal state keeps it.
fn record_abort(registry: &TaskRegistry, task_id: TaskId, err: JoinError) {
    let state = TaskState::failed(
        ErrorKind::GeneralError,
        format!("Processing aborted unexpectedly: {}", err),
    );
    if let Err(e) = registry.update(task_id, state) {
        tracing::warn!(task_id = %task_id, "Could not mark task failed: {}", e);
    }
}

/// Periodically drop completed/failed tasks older than `ttl`
pub fn spawn_expiry_sweeper(
    registry: Arc<TaskRegistry>,
    ttl: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tracing::info!(
        "Task expiry enabled: ttl {}s, sweep every {}s",
        ttl.as_secs(),
        every.as_secs()
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            registry.purge_terminal(ttl);
        }
    })
}
