pub mod analyze;
pub mod page;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Headroom on top of the image limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .settings
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(page::index))
        .route("/api/health", get(page::health))
        .route(analyze::ANALYZE_ROUTE, post(analyze::analyze_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
