use axum::Router;
use axum::extract::DefaultBodyLimit;
use crate::state::AppState;

use tower_http::limit::RequestBodyLimitLayer;

/// Trigger events are small JSON documents.
const MAX_EVENT_BODY_BYTES: usize = 256 * 1024;

pub fn configure_routes() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", api_routes().merge(crate::modules::transcode::router()))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_EVENT_BODY_BYTES))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", axum::routing::get(|| async { "ok" }))
}
