//! Background processing: task registry, file processor and worker pool

pub mod processor;
pub mod registry;
pub mod worker;

pub use processor::{count_characters, FileProcessor, ProcessingError};
pub use registry::{RegistryStats, TaskRegistry};
pub use worker::{spawn_expiry_sweeper, ProcessingJob, QueueSlot, TaskQueue, WorkerPool};
