//! Infrastructure layer: stores, external service clients, admission
//! control, delayed cleanup, and the application services composing them.

pub mod blob_store;
pub mod cleanup;
pub mod job_store;
pub mod lifecycle;
pub mod orchestrator;
pub mod rate_limit;
pub mod transform;

pub use blob_store::{BlobStore, InMemoryBlobStore, WorkerBlobStore};
pub use cleanup::{
    CleanupScheduler, CleanupWorker, CleanupWorkerHandle, InMemoryCleanupQueue, PurgeExecutor,
    QstashScheduler,
};
pub use job_store::{InMemoryJobStore, JobStore};
pub use lifecycle::JobLifecycle;
pub use orchestrator::UploadOrchestrator;
pub use rate_limit::{Admission, FixedWindowLimiter};
pub use transform::{RecordingTransform, ReplicateClient, TransformService};
