//! # Block Routes
//!
//! Routes for one ungraded assignment block, mounted under
//! `/api/courses/{course_id}/blocks/{block_id}`.
//!
//! - `post.rs`: upload, mentor relay and settings save
//! - `get.rs`: current submission, its file, and the block settings
//!
//! Student routes only require authentication; the upload gate itself lives in the
//! submission service. Relay and settings routes require an instructor or staff role in
//! the course.

use crate::auth::guards::{allow_authenticated, allow_staff};
use crate::state::AppState;
use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use get::{download_submission, get_settings, get_submission};
use post::{relay_message, save_sua, upload_assignment};

pub mod get;
pub mod post;

/// Routes:
/// - `POST /upload_assignment`  → store the caller's submission
/// - `GET  /submission`         → caller's current submission metadata
/// - `GET  /submission/file`    → caller's current submission bytes
/// - `POST /relay_message`      → email a message and attachment to the course mentor (staff)
/// - `GET  /settings`           → block configuration (staff)
/// - `POST /save_sua`           → update block configuration (staff)
pub fn block_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/upload_assignment", post(upload_assignment).route_layer(from_fn(allow_authenticated)))
        .route("/submission", get(get_submission).route_layer(from_fn(allow_authenticated)))
        .route("/submission/file", get(download_submission).route_layer(from_fn(allow_authenticated)))
        .route(
            "/relay_message",
            post(relay_message).route_layer(from_fn_with_state(app_state.clone(), allow_staff)),
        )
        .route(
            "/settings",
            get(get_settings).route_layer(from_fn_with_state(app_state.clone(), allow_staff)),
        )
        .route(
            "/save_sua",
            post(save_sua).route_layer(from_fn_with_state(app_state, allow_staff)),
        )
}
