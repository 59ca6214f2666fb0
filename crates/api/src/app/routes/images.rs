//! Job status, webhook callback, and purge-trigger routes.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/:key", get(get_status))
        .route("/:key/webhook", post(webhook))
        .route("/:key/delete", post(delete))
}

/// `GET /api/images/:key` — current job state; `expired` tells pollers to
/// stop once the retention window has elapsed.
pub async fn get_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(key): Path<String>,
) -> axum::response::Response {
    let key = match dto::parse_job_key(&key) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match services.lifecycle.status(key) {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

/// `POST /api/images/:key/webhook` — terminal callback from the transform
/// service. Duplicate delivery is acknowledged with the same bare 200.
pub async fn webhook(
    Extension(services): Extension<Arc<AppServices>>,
    Path(key): Path<String>,
    Json(body): Json<dto::WebhookRequest>,
) -> axum::response::Response {
    let key = match dto::parse_job_key(&key) {
        Ok(key) => key,
        Err(response) => return response,
    };

    let outcome = body.into_outcome();
    match services.lifecycle.handle_callback(key, &outcome) {
        Ok(_ack) => StatusCode::OK.into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

/// `POST /api/images/:key/delete` — purge trigger from the delayed queue.
/// Safe under at-least-once delivery.
pub async fn delete(
    Extension(services): Extension<Arc<AppServices>>,
    Path(key): Path<String>,
) -> axum::response::Response {
    let key = match dto::parse_job_key(&key) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match services.lifecycle.purge(key).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}
