use crate::auth::guards::Empty;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use services::{actor::Actor, error::ServiceError, submission_service::Submission};

/// Public view of a stored upload.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub filename: String,
    pub mimetype: String,
    pub fingerprint: String,
    pub path: String,
    pub uploaded_at: String,
}

impl From<Submission> for SubmissionResponse {
    fn from(s: Submission) -> Self {
        Self {
            filename: s.filename,
            mimetype: s.mimetype,
            fingerprint: s.fingerprint.to_string(),
            path: s.path.to_string(),
            uploaded_at: s.uploaded_at.to_rfc3339(),
        }
    }
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<Empty>::error(message))).into_response()
}

/// Resolves the authenticated user against `course_id`.
pub async fn load_actor(app_state: &AppState, user_id: i64, course_id: i64) -> Result<Actor, Response> {
    match Actor::load(app_state.db(), user_id, course_id).await {
        Ok(Some(actor)) => Ok(actor),
        Ok(None) => Err(error_response(StatusCode::NOT_FOUND, "User not found")),
        Err(e) => {
            tracing::error!(error = %e, user_id, course_id, "failed to load user");
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))
        }
    }
}

/// Maps a service failure onto its HTTP status.
///
/// Validation failures use the bare `{"error": ...}` body the settings editor reads.
pub fn service_error_response(err: ServiceError) -> Response {
    match err {
        ServiceError::PermissionDenied => error_response(StatusCode::FORBIDDEN, "Permission denied"),
        ServiceError::Validation(msg) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
        }
        ServiceError::NotFound(what) => error_response(StatusCode::NOT_FOUND, format!("{what} not found")),
        other => {
            tracing::error!(error = %other, "request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
