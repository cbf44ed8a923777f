use crate::{response::ApiResponse, state::AppState};
use axum::{Json, Router, response::IntoResponse, routing::get};

/// `GET /health`
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

/// Always answers `200 OK`:
///
/// ```json
/// { "success": true, "data": "OK", "message": "Health check passed" }
/// ```
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::success("OK", "Health check passed"))
}
