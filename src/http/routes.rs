use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::compression::CompressionLayer;

use super::handlers::{handle_announce, handle_scrape};
use crate::tracker::Tracker;

/// The passkey is the first path segment and authenticates the user;
/// responses are gzipped when the client advertises support.
#[must_use]
pub fn routes(tracker: Arc<Tracker>) -> Router {
    Router::new()
        .route("/:passkey/announce", get(handle_announce))
        .route("/:passkey/scrape", get(handle_scrape))
        .layer(CompressionLayer::new())
        .with_state(tracker)
}
