//! Background purge worker polling the in-memory queue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use photobooth_core::JobKey;

use super::queue::InMemoryCleanupQueue;

/// Executes one deletion attempt for a key.
///
/// Must be idempotent: the worker gives at-least-once delivery.
#[async_trait]
pub trait PurgeExecutor: Send + Sync {
    type Error: core::fmt::Debug + Send;

    async fn purge(&self, key: JobKey) -> Result<(), Self::Error>;
}

/// Handle to control a running cleanup worker.
#[derive(Debug)]
pub struct CleanupWorkerHandle {
    shutdown: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
}

impl CleanupWorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

/// Polling loop that drains due purge entries and executes them.
#[derive(Debug)]
pub struct CleanupWorker;

impl CleanupWorker {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// Each due key gets a single best-effort purge; failures are logged
    /// and not retried.
    pub fn spawn<P>(
        queue: Arc<InMemoryCleanupQueue>,
        executor: Arc<P>,
        poll_interval: Duration,
    ) -> CleanupWorkerHandle
    where
        P: PurgeExecutor + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            info!("cleanup worker started");
            let mut tick = tokio::time::interval(poll_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = tick.tick() => {
                        for key in queue.claim_due(Utc::now()) {
                            if let Err(err) = executor.purge(key).await {
                                warn!(%key, error = ?err, "cleanup purge failed");
                            }
                        }
                    }
                }
            }
            info!("cleanup worker stopped");
        });

        CleanupWorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::CleanupScheduler;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingExecutor {
        purged: Mutex<Vec<JobKey>>,
    }

    impl RecordingExecutor {
        fn purged(&self) -> Vec<JobKey> {
            self.purged.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PurgeExecutor for RecordingExecutor {
        type Error = String;

        async fn purge(&self, key: JobKey) -> Result<(), Self::Error> {
            self.purged.lock().unwrap().push(key);
            Ok(())
        }
    }

    #[tokio::test]
    async fn purges_exactly_once_after_the_delay() {
        let queue = InMemoryCleanupQueue::arc();
        let executor = Arc::new(RecordingExecutor::default());
        let handle = CleanupWorker::spawn(
            queue.clone(),
            executor.clone(),
            Duration::from_millis(10),
        );

        let key = JobKey::new();
        queue
            .schedule(key, Duration::from_millis(300))
            .await
            .unwrap();

        // Before the delay elapses, nothing fires.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(executor.purged().is_empty());

        // Poll briefly until the trigger lands.
        for _ in 0..300 {
            if !executor.purged().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(executor.purged(), vec![key]);

        // The entry was drained; no second attempt happens.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(executor.purged(), vec![key]);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn executor_failures_do_not_stop_the_worker() {
        #[derive(Debug, Default)]
        struct FailingExecutor {
            calls: Mutex<usize>,
        }

        #[async_trait]
        impl PurgeExecutor for FailingExecutor {
            type Error = String;

            async fn purge(&self, _key: JobKey) -> Result<(), Self::Error> {
                *self.calls.lock().unwrap() += 1;
                Err("blob store down".to_string())
            }
        }

        let queue = InMemoryCleanupQueue::arc();
        let executor = Arc::new(FailingExecutor::default());
        let handle = CleanupWorker::spawn(
            queue.clone(),
            executor.clone(),
            Duration::from_millis(10),
        );

        queue.schedule(JobKey::new(), Duration::ZERO).await.unwrap();
        queue.schedule(JobKey::new(), Duration::ZERO).await.unwrap();

        for _ in 0..100 {
            if *executor.calls.lock().unwrap() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(*executor.calls.lock().unwrap(), 2);

        handle.shutdown().await;
    }
}
