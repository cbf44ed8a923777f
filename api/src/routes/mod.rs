//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → health check (public)
//! - `/courses/{course_id}/blocks/{block_id}` → ungraded assignment block: uploads,
//!   mentor relay and settings (authenticated)

use crate::routes::{blocks::block_routes, health::health_routes};
use crate::state::AppState;
use axum::{Router, extract::DefaultBodyLimit};

pub mod blocks;
pub mod common;
pub mod health;

/// Builds the application router with its state applied.
///
/// The default body limit is lifted for block routes; upload handlers enforce
/// `MAX_UPLOAD_BYTES` themselves while reading the multipart stream.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest(
            "/courses/{course_id}/blocks/{block_id}",
            block_routes(app_state.clone()).layer(DefaultBodyLimit::disable()),
        )
        .with_state(app_state)
}
