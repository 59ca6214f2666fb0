//! Post-issuance job lifecycle: webhook receiver, purge, status lookup.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use photobooth_core::{CallbackAck, JobKey, JobStatusView, TransformOutcome};

use crate::blob_store::{self, BlobStore};
use crate::cleanup::PurgeExecutor;
use crate::job_store::{JobStore, JobStoreError};

/// Lifecycle error surfaced at the callback/lookup boundary.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The key was never issued (forged, stale, or mistyped). Lookups and
    /// callbacks never create jobs as a side effect.
    #[error("unknown job")]
    UnknownJob,

    #[error(transparent)]
    Store(JobStoreError),
}

impl From<JobStoreError> for LifecycleError {
    fn from(value: JobStoreError) -> Self {
        match value {
            JobStoreError::NotFound(_) => LifecycleError::UnknownJob,
            other => LifecycleError::Store(other),
        }
    }
}

/// Owns every transition after key issuance: the terminal callback, the
/// purge, and the read-side status view.
pub struct JobLifecycle {
    jobs: Arc<dyn JobStore>,
    blobs: Arc<dyn BlobStore>,
}

impl JobLifecycle {
    pub fn new(jobs: Arc<dyn JobStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { jobs, blobs }
    }

    /// Apply the transform service's terminal callback.
    ///
    /// Duplicate delivery is acknowledged as success without touching the
    /// record; an unknown key is rejected.
    pub fn handle_callback(
        &self,
        key: JobKey,
        outcome: &TransformOutcome,
    ) -> Result<CallbackAck, LifecycleError> {
        let ack = self.jobs.apply_callback(key, outcome)?;
        match ack {
            CallbackAck::Applied => {
                let outcome_label = match outcome {
                    TransformOutcome::Succeeded { .. } => "succeeded",
                    TransformOutcome::Failed { .. } => "failed",
                };
                info!(%key, outcome = outcome_label, "job finalized");
            }
            CallbackAck::AlreadyFinalized => {
                debug!(%key, "duplicate terminal callback ignored");
            }
        }
        Ok(ack)
    }

    /// One deletion attempt for `key`.
    ///
    /// The job is marked `Deleted` first so deletion wins any race with a
    /// late callback; blob removal afterwards is best-effort. Idempotent:
    /// re-delivery of the trigger on an already-deleted key succeeds.
    pub async fn purge(&self, key: JobKey) -> Result<(), LifecycleError> {
        self.jobs.mark_deleted(key)?;

        for path in [blob_store::source_path(key), blob_store::result_path(key)] {
            if let Err(err) = self.blobs.delete(&path).await {
                warn!(%key, path = %path, error = %err, "blob delete failed during purge");
            }
        }

        info!(%key, "job purged");
        Ok(())
    }

    /// Current externally-visible state for `key`.
    pub fn status(&self, key: JobKey) -> Result<JobStatusView, LifecycleError> {
        let job = self.jobs.get(key)?.ok_or(LifecycleError::UnknownJob)?;
        Ok(job.status_view())
    }
}

#[async_trait]
impl PurgeExecutor for JobLifecycle {
    type Error = LifecycleError;

    async fn purge(&self, key: JobKey) -> Result<(), Self::Error> {
        JobLifecycle::purge(self, key).await
    }
}
