//! Replicate predictions client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use tracing::debug;

use photobooth_core::JobKey;

use super::{TransformError, TransformService};

const DEFAULT_BASE_URL: &str = "https://api.replicate.com";

/// Client for Replicate's predictions API.
///
/// The image travels inline as a data URL; the prediction registers a
/// key-addressed webhook filtered to the `completed` event, so exactly one
/// terminal notification comes back per submission.
#[derive(Debug, Clone)]
pub struct ReplicateClient {
    base_url: String,
    api_token: String,
    model_version: String,
    http: reqwest::Client,
}

impl ReplicateClient {
    pub fn new(api_token: impl Into<String>, model_version: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_token, model_version)
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        model_version: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            model_version: model_version.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TransformService for ReplicateClient {
    async fn submit(
        &self,
        key: JobKey,
        image: &[u8],
        webhook_url: &str,
    ) -> Result<(), TransformError> {
        let image = format!(
            "data:application/octet-stream;base64,{}",
            BASE64.encode(image)
        );

        let body = json!({
            "version": self.model_version,
            "input": {
                "image": image,
                "target_age": "default",
            },
            "webhook": webhook_url,
            "webhook_events_filter": ["completed"],
        });

        debug!(%key, webhook_url, "submitting transform prediction");

        let response = self
            .http
            .post(format!("{}/v1/predictions", self.base_url))
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransformError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransformError::UnexpectedStatus(
                response.status().as_u16(),
            ));
        }
        Ok(())
    }
}
