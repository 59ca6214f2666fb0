//! Delayed cleanup scheduling.
//!
//! ## Design
//!
//! - One purge per key, fired after a fixed retention delay from submission
//! - Scheduling is idempotent: the earliest schedule wins, re-delivery never
//!   extends retention
//! - The purge does not wait for the transform; it fires in whatever state
//!   the job is in, and deletion wins any race with a late callback
//!
//! ## Components
//!
//! - `CleanupScheduler`: the scheduling seam the orchestrator calls
//! - `InMemoryCleanupQueue` + `CleanupWorker`: in-process delayed queue and
//!   polling purge loop (dev/tests; not crash-safe)
//! - `QstashScheduler`: durable external delayed queue that calls the
//!   delete route back after the delay (production; crash-safe)

use std::time::Duration;

use async_trait::async_trait;

use photobooth_core::JobKey;

pub mod qstash;
pub mod queue;
pub mod worker;

pub use qstash::QstashScheduler;
pub use queue::InMemoryCleanupQueue;
pub use worker::{CleanupWorker, CleanupWorkerHandle, PurgeExecutor};

/// Schedules one future deletion attempt per job key.
#[async_trait]
pub trait CleanupScheduler: Send + Sync {
    async fn schedule(&self, key: JobKey, delay: Duration) -> Result<(), CleanupError>;
}

/// Cleanup scheduling error.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("failed to schedule cleanup: {0}")]
    Schedule(String),
}
