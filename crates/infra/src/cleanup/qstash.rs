//! Durable delayed-queue client (Upstash QStash publish protocol).

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use photobooth_core::JobKey;

use super::{CleanupError, CleanupScheduler};

const DELAY_HEADER: &str = "Upstash-Delay";

/// Publishes the purge trigger to an external delayed queue, which calls
/// the key-addressed delete route back once the delay elapses.
///
/// This is the crash-safe path: a pending purge survives our restarts
/// because the timer lives in the queue service, not in this process.
#[derive(Debug, Clone)]
pub struct QstashScheduler {
    publish_url: String,
    token: String,
    callback_base_url: String,
    http: reqwest::Client,
}

impl QstashScheduler {
    /// `publish_url` is the queue's publish endpoint (e.g.
    /// `https://qstash.upstash.io/v1/publish`); `callback_base_url` is this
    /// service's externally reachable base.
    pub fn new(
        publish_url: impl Into<String>,
        token: impl Into<String>,
        callback_base_url: impl Into<String>,
    ) -> Self {
        Self {
            publish_url: publish_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            callback_base_url: callback_base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn publish_target(&self, key: JobKey) -> String {
        format!(
            "{}/{}/api/images/{}/delete",
            self.publish_url, self.callback_base_url, key
        )
    }
}

#[async_trait]
impl CleanupScheduler for QstashScheduler {
    async fn schedule(&self, key: JobKey, delay: Duration) -> Result<(), CleanupError> {
        let target = self.publish_target(key);
        debug!(%key, delay_secs = delay.as_secs(), "publishing delayed purge");

        let response = self
            .http
            .post(&target)
            .bearer_auth(&self.token)
            .header(DELAY_HEADER, format!("{}s", delay.as_secs()))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| CleanupError::Schedule(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CleanupError::Schedule(format!(
                "queue returned status {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }
}
