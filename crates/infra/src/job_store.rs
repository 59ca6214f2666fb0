//! Job record storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use photobooth_core::{CallbackAck, Job, JobKey, TransformOutcome};

/// Job store abstraction.
///
/// State transitions are store operations on purpose: lookup and mutation
/// must happen atomically so a webhook callback and a purge racing on the
/// same key serialize cleanly. Each transition has exactly one owning
/// caller; nothing outside the store ever holds a mutable job reference.
pub trait JobStore: Send + Sync {
    /// Insert a freshly created job. Create-only; keys are never reused.
    fn insert(&self, job: Job) -> Result<(), JobStoreError>;

    /// Fetch a job by key.
    fn get(&self, key: JobKey) -> Result<Option<Job>, JobStoreError>;

    /// Apply a terminal callback. A non-`Pending` job is acknowledged as
    /// `AlreadyFinalized` without being touched.
    fn apply_callback(
        &self,
        key: JobKey,
        outcome: &TransformOutcome,
    ) -> Result<CallbackAck, JobStoreError>;

    /// Mark a job `Deleted` and return the record (the caller still needs
    /// its blob refs for cleanup). Idempotent on an already-deleted key.
    fn mark_deleted(&self, key: JobKey) -> Result<Job, JobStoreError>;
}

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobKey),
    #[error("job already exists: {0}")]
    AlreadyExists(JobKey),
    #[error("storage error: {0}")]
    Storage(String),
}

/// In-memory job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobKey, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: Job) -> Result<(), JobStoreError> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| JobStoreError::Storage("lock poisoned".to_string()))?;

        if jobs.contains_key(&job.key) {
            return Err(JobStoreError::AlreadyExists(job.key));
        }
        jobs.insert(job.key, job);
        Ok(())
    }

    fn get(&self, key: JobKey) -> Result<Option<Job>, JobStoreError> {
        let jobs = self
            .jobs
            .read()
            .map_err(|_| JobStoreError::Storage("lock poisoned".to_string()))?;
        Ok(jobs.get(&key).cloned())
    }

    fn apply_callback(
        &self,
        key: JobKey,
        outcome: &TransformOutcome,
    ) -> Result<CallbackAck, JobStoreError> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| JobStoreError::Storage("lock poisoned".to_string()))?;

        let job = jobs.get_mut(&key).ok_or(JobStoreError::NotFound(key))?;
        Ok(job.apply_callback(outcome, Utc::now()))
    }

    fn mark_deleted(&self, key: JobKey) -> Result<Job, JobStoreError> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| JobStoreError::Storage("lock poisoned".to_string()))?;

        let job = jobs.get_mut(&key).ok_or(JobStoreError::NotFound(key))?;
        job.mark_deleted(Utc::now());
        Ok(job.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photobooth_core::JobState;

    fn pending_job() -> Job {
        Job::new(JobKey::new(), "src", Utc::now())
    }

    fn success() -> TransformOutcome {
        TransformOutcome::Succeeded {
            result_ref: "r1".to_string(),
        }
    }

    #[test]
    fn insert_is_create_only() {
        let store = InMemoryJobStore::new();
        let job = pending_job();

        store.insert(job.clone()).unwrap();
        let err = store.insert(job).unwrap_err();
        assert!(matches!(err, JobStoreError::AlreadyExists(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn callback_on_unknown_key_is_rejected() {
        let store = InMemoryJobStore::new();
        let err = store.apply_callback(JobKey::new(), &success()).unwrap_err();
        assert!(matches!(err, JobStoreError::NotFound(_)));
    }

    #[test]
    fn callback_transitions_once_then_noops() {
        let store = InMemoryJobStore::new();
        let job = pending_job();
        let key = job.key;
        store.insert(job).unwrap();

        assert_eq!(
            store.apply_callback(key, &success()).unwrap(),
            CallbackAck::Applied
        );
        assert_eq!(
            store.apply_callback(key, &success()).unwrap(),
            CallbackAck::AlreadyFinalized
        );

        let stored = store.get(key).unwrap().unwrap();
        assert_eq!(stored.state, JobState::Completed);
        assert_eq!(stored.result_ref.as_deref(), Some("r1"));
    }

    #[test]
    fn mark_deleted_is_idempotent_and_returns_the_record() {
        let store = InMemoryJobStore::new();
        let job = pending_job();
        let key = job.key;
        let source_ref = job.source_ref.clone();
        store.insert(job).unwrap();

        let deleted = store.mark_deleted(key).unwrap();
        assert_eq!(deleted.state, JobState::Deleted);
        assert_eq!(deleted.source_ref, source_ref);

        // At-least-once delivery of the purge trigger.
        let again = store.mark_deleted(key).unwrap();
        assert_eq!(again.state, JobState::Deleted);
    }

    #[test]
    fn deleted_job_swallows_late_callbacks() {
        let store = InMemoryJobStore::new();
        let job = pending_job();
        let key = job.key;
        store.insert(job).unwrap();

        store.mark_deleted(key).unwrap();
        assert_eq!(
            store.apply_callback(key, &success()).unwrap(),
            CallbackAck::AlreadyFinalized
        );
        assert_eq!(store.get(key).unwrap().unwrap().state, JobState::Deleted);
    }
}
