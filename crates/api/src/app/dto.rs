//! Request/response DTOs and JSON mapping helpers.

use axum::http::StatusCode;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use photobooth_core::{JobKey, TransformOutcome};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Data URL (or bare base64) of the image to transform.
    pub image: String,
}

/// Terminal callback payload from the transform service.
///
/// `output` arrives as a plain URL or an array of URLs depending on the
/// model; either way the last entry is the finished artifact.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub status: String,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl WebhookRequest {
    /// Collapse the payload into the domain outcome.
    pub fn into_outcome(self) -> TransformOutcome {
        if self.status == "succeeded" {
            match self.output.as_ref().and_then(result_ref) {
                Some(result_ref) => TransformOutcome::Succeeded { result_ref },
                None => TransformOutcome::Failed {
                    error: "transform succeeded without an output reference".to_string(),
                },
            }
        } else {
            TransformOutcome::Failed {
                error: self
                    .error
                    .unwrap_or_else(|| format!("transform {}", self.status)),
            }
        }
    }
}

fn result_ref(output: &serde_json::Value) -> Option<String> {
    match output {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => items
            .iter()
            .rev()
            .find_map(|item| item.as_str().map(str::to_string)),
        _ => None,
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub key: JobKey,
}

// -------------------------
// Mapping helpers
// -------------------------

/// Decode a data-URL (or bare base64) image payload into raw bytes.
pub fn decode_image(raw: &str) -> Result<Vec<u8>, axum::response::Response> {
    let encoded = match raw.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => raw,
    };

    BASE64.decode(encoded.trim()).map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_input",
            "image must be base64-encoded",
        )
    })
}

/// Parse a path segment into a job key.
pub fn parse_job_key(raw: &str) -> Result<JobKey, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_key", "malformed job key")
    })
}
