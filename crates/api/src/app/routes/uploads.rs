//! Upload submission route.

use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// `POST /api/upload` — admit one image and return its key immediately,
/// without waiting for the transform.
pub async fn upload(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::UploadRequest>,
) -> axum::response::Response {
    let image = match dto::decode_image(&body.image) {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };

    match services.orchestrator.submit(image) {
        Ok(key) => Json(dto::UploadResponse { key }).into_response(),
        Err(e) => errors::submit_error_to_response(e),
    }
}
