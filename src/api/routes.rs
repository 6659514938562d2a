use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::compression::CompressionLayer;

use super::handlers::{get_file, get_files, get_status, get_user, get_users, method_fallback, unknown_api_call};
use crate::tracker::Tracker;

/// GET /api/files[/{id}], GET /api/users[/{id}], GET /api/status.
///
/// Unknown endpoints are 404, non-GET/POST methods 405, both with the JSON
/// error body; responses are gzipped when the client advertises support.
#[must_use]
pub fn routes(tracker: Arc<Tracker>) -> Router {
    Router::new()
        .route("/api/status", get(get_status).fallback(method_fallback))
        .route("/api/files", get(get_files).fallback(method_fallback))
        .route("/api/files/:id", get(get_file).fallback(method_fallback))
        .route("/api/users", get(get_users).fallback(method_fallback))
        .route("/api/users/:id", get(get_user).fallback(method_fallback))
        .fallback(unknown_api_call)
        .layer(CompressionLayer::new())
        .with_state(tracker)
}
