use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::{SubmissionResponse, error_response, service_error_response};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use db::field_store::BlockKey;
use services::{
    block::{AssignmentSettings, BlockContext},
    submission_service::SubmissionService,
};
use std::io::Read;

fn submission_service(app_state: &AppState, course_id: i64, block_id: i64, user_id: i64) -> SubmissionService {
    SubmissionService::new(
        app_state.storage(),
        tracing::info_span!("submission", course_id, block_id, user_id),
    )
}

/// GET /api/courses/{course_id}/blocks/{block_id}/submission
///
/// Returns the caller's current submission for this block.
///
/// ### Responses
/// - `200 OK`
/// ```json
/// {
///   "success": true,
///   "data": {
///     "filename": "hw1.pdf",
///     "mimetype": "application/pdf",
///     "fingerprint": "3f786850e387550fdab836ed7e6dc881de23001b",
///     "path": "submissions/user_42/3f786850e387550fdab836ed7e6dc881de23001b/hw1.pdf",
///     "uploaded_at": "2026-10-19T09:00:00+00:00"
///   },
///   "message": "Submission retrieved"
/// }
/// ```
/// - `404 Not Found` when nothing has been uploaded yet
pub async fn get_submission(
    State(app_state): State<AppState>,
    Path((course_id, block_id)): Path<(i64, i64)>,
    AuthUser(claims): AuthUser,
) -> Response {
    let block = BlockContext::new(app_state.fields(), BlockKey::new(course_id, block_id));
    let service = submission_service(&app_state, course_id, block_id, claims.sub);

    match service.current_submission(claims.sub, &block).await {
        Ok(Some(submission)) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                SubmissionResponse::from(submission),
                "Submission retrieved",
            )),
        )
            .into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "No submission found"),
        Err(e) => service_error_response(e),
    }
}

/// GET /api/courses/{course_id}/blocks/{block_id}/submission/file
///
/// Streams back the bytes of the caller's current submission with its recorded MIME type
/// and original filename.
///
/// ### Responses
/// - `200 OK` with the file as an attachment
/// - `404 Not Found` when nothing has been uploaded yet or the blob is missing
pub async fn download_submission(
    State(app_state): State<AppState>,
    Path((course_id, block_id)): Path<(i64, i64)>,
    AuthUser(claims): AuthUser,
) -> Response {
    let block = BlockContext::new(app_state.fields(), BlockKey::new(course_id, block_id));
    let service = submission_service(&app_state, course_id, block_id, claims.sub);

    let submission = match service.current_submission(claims.sub, &block).await {
        Ok(Some(s)) => s,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "No submission found"),
        Err(e) => return service_error_response(e),
    };

    let mut buffer = Vec::new();
    let read = service
        .open(&submission)
        .and_then(|mut reader| reader.read_to_end(&mut buffer).map_err(Into::into));
    if let Err(e) = read {
        tracing::error!(error = %e, path = %submission.path, "stored submission is unreadable");
        return error_response(StatusCode::NOT_FOUND, "Submission file not found");
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", submission.filename))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&submission.mimetype)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    (StatusCode::OK, headers, buffer).into_response()
}

/// GET /api/courses/{course_id}/blocks/{block_id}/settings
///
/// Returns the block configuration, with defaults for anything never saved.
pub async fn get_settings(
    State(app_state): State<AppState>,
    Path((course_id, block_id)): Path<(i64, i64)>,
) -> Response {
    match AssignmentSettings::load(app_state.fields().as_ref(), BlockKey::new(course_id, block_id)).await {
        Ok(settings) => (
            StatusCode::OK,
            Json(ApiResponse::success(settings, "Settings retrieved")),
        )
            .into_response(),
        Err(e) => service_error_response(e.into()),
    }
}
