//! Upload admission and fan-out (application-level orchestration).
//!
//! ## Submission flow
//!
//! ```text
//! image bytes
//!   ↓
//! 1. Validate (non-empty)
//!   ↓
//! 2. Rate-limit gate (short-circuit: rejection creates zero side effects)
//!   ↓
//! 3. Generate key, insert Pending job record
//!   ↓
//! 4. Fire three independent tasks: blob write, transform submission,
//!    delayed cleanup. None is awaited; none can fail the caller
//!   ↓
//! 5. Return the key
//! ```
//!
//! Once the key exists the caller holds a durable handle, so a failing
//! side effect is an observable inconsistency, not an error: best-effort
//! side effects, guaranteed handle. There is no compensating-transaction
//! layer, and no automatic retry: one attempt per downstream call.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use photobooth_core::{Job, JobKey};

use crate::blob_store::{self, BlobStore};
use crate::cleanup::CleanupScheduler;
use crate::job_store::{JobStore, JobStoreError};
use crate::rate_limit::FixedWindowLimiter;
use crate::transform::TransformService;

/// Label under which every upload draws from the shared admission budget.
pub const UPLOAD_OPERATION: &str = "upload";

/// Admission failure surfaced to the caller. Everything here happens
/// before a key is issued.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error(transparent)]
    Store(#[from] JobStoreError),
}

/// Composes admission control, key generation, and the downstream fan-out
/// behind the submit contract.
pub struct UploadOrchestrator {
    jobs: Arc<dyn JobStore>,
    limiter: Arc<FixedWindowLimiter>,
    blobs: Arc<dyn BlobStore>,
    transform: Arc<dyn TransformService>,
    cleanup: Arc<dyn CleanupScheduler>,
    public_base_url: String,
    retention: Duration,
}

impl UploadOrchestrator {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        limiter: Arc<FixedWindowLimiter>,
        blobs: Arc<dyn BlobStore>,
        transform: Arc<dyn TransformService>,
        cleanup: Arc<dyn CleanupScheduler>,
        public_base_url: impl Into<String>,
        retention: Duration,
    ) -> Self {
        Self {
            jobs,
            limiter,
            blobs,
            transform,
            cleanup,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            retention,
        }
    }

    /// Admit one upload and return its key without waiting for any
    /// downstream work. Must run inside a tokio runtime (the side effects
    /// are spawned tasks).
    pub fn submit(&self, image: Vec<u8>) -> Result<JobKey, SubmitError> {
        if image.is_empty() {
            return Err(SubmitError::InvalidInput("empty image payload".to_string()));
        }

        let admission = self.limiter.admit(UPLOAD_OPERATION);
        if !admission.allowed {
            debug!(retry_after = ?admission.retry_after, "upload rejected by rate limiter");
            return Err(SubmitError::RateLimited {
                retry_after: admission.retry_after,
            });
        }

        let key = JobKey::new();
        let source_ref = blob_store::source_path(key);
        self.jobs.insert(Job::new(key, source_ref.clone(), Utc::now()))?;

        // Fire-and-forget fan-out: each side effect is supervised on its
        // own, and a failure is logged but never reaches the caller.
        let image = Arc::new(image);

        {
            let blobs = self.blobs.clone();
            let image = image.clone();
            tokio::spawn(async move {
                if let Err(err) = blobs.put(&source_ref, &image).await {
                    warn!(%key, error = %err, "source blob write failed");
                }
            });
        }

        {
            let transform = self.transform.clone();
            let image = image.clone();
            let webhook_url = format!("{}/api/images/{}/webhook", self.public_base_url, key);
            tokio::spawn(async move {
                if let Err(err) = transform.submit(key, &image, &webhook_url).await {
                    warn!(%key, error = %err, "transform submission failed");
                }
            });
        }

        {
            let cleanup = self.cleanup.clone();
            let retention = self.retention;
            tokio::spawn(async move {
                if let Err(err) = cleanup.schedule(key, retention).await {
                    warn!(%key, error = %err, "cleanup scheduling failed");
                }
            });
        }

        info!(%key, "upload admitted");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::InMemoryBlobStore;
    use crate::cleanup::InMemoryCleanupQueue;
    use crate::job_store::InMemoryJobStore;
    use crate::transform::RecordingTransform;
    use photobooth_core::JobState;

    struct Fixture {
        orchestrator: UploadOrchestrator,
        jobs: Arc<InMemoryJobStore>,
        blobs: Arc<InMemoryBlobStore>,
        transform: Arc<RecordingTransform>,
        cleanup: Arc<InMemoryCleanupQueue>,
    }

    fn fixture(ceiling: u32) -> Fixture {
        let jobs = InMemoryJobStore::arc();
        let blobs = InMemoryBlobStore::arc();
        let transform = RecordingTransform::arc();
        let cleanup = InMemoryCleanupQueue::arc();
        let limiter = Arc::new(FixedWindowLimiter::new(
            ceiling,
            Duration::from_secs(3600),
        ));

        let orchestrator = UploadOrchestrator::new(
            jobs.clone(),
            limiter,
            blobs.clone(),
            transform.clone(),
            cleanup.clone(),
            "https://photobooth.example.com/",
            Duration::from_secs(86_400),
        );

        Fixture {
            orchestrator,
            jobs,
            blobs,
            transform,
            cleanup,
        }
    }

    /// The fan-out is fire-and-forget; poll briefly for its effects.
    async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..100 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn submit_returns_a_fresh_key_and_a_pending_job() {
        let fx = fixture(10);

        let key = fx.orchestrator.submit(b"image".to_vec()).unwrap();
        let other = fx.orchestrator.submit(b"image".to_vec()).unwrap();
        assert_ne!(key, other);

        // The record is visible synchronously: pollers and the webhook may
        // race the fan-out.
        let job = fx.jobs.get(key).unwrap().unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.source_ref, key.to_string());
    }

    #[tokio::test]
    async fn submit_fans_out_to_all_three_side_effects() {
        let fx = fixture(10);
        let key = fx.orchestrator.submit(b"raw image bytes".to_vec()).unwrap();

        assert!(
            eventually(|| {
                fx.blobs.contains(&key.to_string())
                    && fx.transform.submissions().len() == 1
                    && fx.cleanup.len() == 1
            })
            .await
        );

        let submission = &fx.transform.submissions()[0];
        assert_eq!(submission.key, key);
        assert_eq!(submission.image_len, b"raw image bytes".len());
        assert_eq!(
            submission.webhook_url,
            format!("https://photobooth.example.com/api/images/{key}/webhook")
        );
    }

    #[tokio::test]
    async fn rejected_submission_creates_zero_side_effects() {
        let fx = fixture(1);
        fx.orchestrator.submit(b"first".to_vec()).unwrap();

        let err = fx.orchestrator.submit(b"second".to_vec()).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::RateLimited {
                retry_after: Some(_)
            }
        ));

        // Give the admitted upload's fan-out time to land, then confirm the
        // rejected one left nothing behind.
        assert!(
            eventually(|| {
                fx.cleanup.len() == 1
                    && fx.blobs.len() == 1
                    && fx.transform.submissions().len() == 1
            })
            .await
        );
        assert_eq!(fx.jobs.len(), 1);
    }

    #[tokio::test]
    async fn empty_payload_is_rejected_before_any_side_effect() {
        let fx = fixture(10);

        let err = fx.orchestrator.submit(Vec::new()).unwrap_err();
        assert!(matches!(err, SubmitError::InvalidInput(_)));
        assert!(fx.jobs.is_empty());
        assert!(fx.blobs.is_empty());
        assert!(fx.cleanup.is_empty());
    }

    #[tokio::test]
    async fn concurrent_submissions_admit_at_most_the_ceiling() {
        let ceiling = 4;
        let fx = Arc::new(fixture(ceiling));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let fx = fx.clone();
                tokio::spawn(async move { fx.orchestrator.submit(b"img".to_vec()).is_ok() })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, ceiling as usize);
        assert_eq!(fx.jobs.len(), ceiling as usize);
    }
}
