//! In-memory delayed purge queue.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use photobooth_core::JobKey;

use super::{CleanupError, CleanupScheduler};

/// Delayed purge entries indexed by job key.
///
/// Pure data structure; [`super::CleanupWorker`] drives it. Not crash-safe:
/// pending purges die with the process, which is why production wiring
/// prefers the external queue.
#[derive(Debug, Default)]
pub struct InMemoryCleanupQueue {
    entries: Mutex<HashMap<JobKey, DateTime<Utc>>>,
}

impl InMemoryCleanupQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a purge for `key` at `run_at`. Earliest schedule wins;
    /// re-scheduling the same key never extends its retention.
    pub fn schedule_at(&self, key: JobKey, run_at: DateTime<Utc>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(key)
            .and_modify(|existing| {
                if run_at < *existing {
                    *existing = run_at;
                }
            })
            .or_insert(run_at);
    }

    /// Remove and return every key whose delay has elapsed at `now`.
    pub fn claim_due(&self, now: DateTime<Utc>) -> Vec<JobKey> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut due = Vec::new();
        entries.retain(|key, run_at| {
            if *run_at <= now {
                due.push(*key);
                false
            } else {
                true
            }
        });
        due
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CleanupScheduler for InMemoryCleanupQueue {
    async fn schedule(&self, key: JobKey, delay: Duration) -> Result<(), CleanupError> {
        let delay = chrono::Duration::from_std(delay)
            .map_err(|e| CleanupError::Schedule(e.to_string()))?;
        self.schedule_at(key, Utc::now() + delay);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn claims_only_elapsed_entries() {
        let queue = InMemoryCleanupQueue::new();
        let early = JobKey::new();
        let late = JobKey::new();

        queue.schedule_at(early, at(10));
        queue.schedule_at(late, at(100));

        assert!(queue.claim_due(at(5)).is_empty());
        assert_eq!(queue.claim_due(at(10)), vec![early]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.claim_due(at(100)), vec![late]);
        assert!(queue.is_empty());
    }

    #[test]
    fn claim_is_a_drain() {
        let queue = InMemoryCleanupQueue::new();
        let key = JobKey::new();
        queue.schedule_at(key, at(10));

        assert_eq!(queue.claim_due(at(20)), vec![key]);
        // The trigger is gone; re-delivery comes from re-scheduling only.
        assert!(queue.claim_due(at(20)).is_empty());
    }

    #[test]
    fn rescheduling_never_extends_retention() {
        let queue = InMemoryCleanupQueue::new();
        let key = JobKey::new();

        queue.schedule_at(key, at(10));
        queue.schedule_at(key, at(500));
        assert_eq!(queue.claim_due(at(10)), vec![key]);

        queue.schedule_at(key, at(50));
        queue.schedule_at(key, at(20));
        assert!(queue.claim_due(at(19)).is_empty());
        assert_eq!(queue.claim_due(at(20)), vec![key]);
    }
}
