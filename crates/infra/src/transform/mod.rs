//! Transform service port (external image transformation).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use photobooth_core::JobKey;

pub mod replicate;

pub use replicate::ReplicateClient;

/// External transformation service.
#[async_trait]
pub trait TransformService: Send + Sync {
    /// Submit a transform for `key`, registering `webhook_url` to be called
    /// once with the terminal outcome.
    async fn submit(
        &self,
        key: JobKey,
        image: &[u8],
        webhook_url: &str,
    ) -> Result<(), TransformError>;
}

/// Transform submission error.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("transform request failed: {0}")]
    Transport(String),
    #[error("transform service returned status {0}")]
    UnexpectedStatus(u16),
}

/// A submission captured by [`RecordingTransform`].
#[derive(Debug, Clone)]
pub struct SubmittedTransform {
    pub key: JobKey,
    pub image_len: usize,
    pub webhook_url: String,
}

/// Recording stub for tests and unwired dev environments: accepts every
/// submission and remembers it. The webhook never fires on its own.
#[derive(Debug, Default)]
pub struct RecordingTransform {
    submissions: Mutex<Vec<SubmittedTransform>>,
}

impl RecordingTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn submissions(&self) -> Vec<SubmittedTransform> {
        self.submissions
            .lock()
            .map(|subs| subs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TransformService for RecordingTransform {
    async fn submit(
        &self,
        key: JobKey,
        image: &[u8],
        webhook_url: &str,
    ) -> Result<(), TransformError> {
        if let Ok(mut subs) = self.submissions.lock() {
            subs.push(SubmittedTransform {
                key,
                image_len: image.len(),
                webhook_url: webhook_url.to_string(),
            });
        }
        Ok(())
    }
}
