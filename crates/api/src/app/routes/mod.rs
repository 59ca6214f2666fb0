use axum::{routing::post, Router};

pub mod images;
pub mod system;
pub mod uploads;

/// Router for the public API surface.
pub fn router() -> Router {
    Router::new()
        .route("/api/upload", post(uploads::upload))
        .nest("/api/images", images::router())
}
