use crate::auth::AuthUser;
use crate::routes::common::{error_response, load_actor, service_error_response};
use crate::state::AppState;
use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::{Field, MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use db::field_store::BlockKey;
use services::{
    block::BlockContext,
    email::MailAttachment,
    error::ServiceError,
    relay_service::{MalformedRequest, RelayForm, RelayReply, RelayService, accepts_json},
    settings_service::{RawSettings, SettingsService},
    submission_service::{SubmissionService, upload_allowed},
};
use std::io::{Seek, SeekFrom, Write};
use tempfile::SpooledTempFile;
use util::config;

/// Uploads up to this size stay in memory; larger ones spill to a temporary file.
const SPOOL_IN_MEMORY_BYTES: usize = 1024 * 1024;

const FALLBACK_FILENAME: &str = "upload";

/// Cap for the `subject` and `message` parts of a relay form.
pub const MAX_TEXT_FIELD_BYTES: u64 = 64 * 1024;

struct SpooledUpload {
    file: SpooledTempFile,
    filename: String,
    mimetype: String,
}

enum SpoolError {
    TooLarge,
    Multipart(MultipartError),
    Io(std::io::Error),
}

/// Declared content type of a part, or a guess from its filename.
fn part_mimetype(field: &Field<'_>, filename: &str) -> String {
    field
        .content_type()
        .map(str::to_owned)
        .unwrap_or_else(|| mime_guess::from_path(filename).first_or_octet_stream().to_string())
}

/// Streams one file part into a spooled buffer, rewound to its start.
async fn spool_field(mut field: Field<'_>, limit: u64) -> Result<SpooledUpload, SpoolError> {
    let filename = field.file_name().unwrap_or(FALLBACK_FILENAME).to_string();
    let mimetype = part_mimetype(&field, &filename);

    let mut file = SpooledTempFile::new(SPOOL_IN_MEMORY_BYTES);
    let mut written: u64 = 0;
    while let Some(chunk) = field.chunk().await.map_err(SpoolError::Multipart)? {
        written += chunk.len() as u64;
        if written > limit {
            return Err(SpoolError::TooLarge);
        }
        file.write_all(&chunk).map_err(SpoolError::Io)?;
    }
    file.seek(SeekFrom::Start(0)).map_err(SpoolError::Io)?;

    Ok(SpooledUpload {
        file,
        filename,
        mimetype,
    })
}

/// POST /api/courses/{course_id}/blocks/{block_id}/upload_assignment
///
/// Stores the caller's file as their submission for this block. The file is fingerprinted
/// and written once to `submissions/user_{id}/{sha1}/{filename}`; uploading identical bytes
/// again writes nothing.
///
/// ### Request Body (Multipart Form Data)
/// - `file` (file, required)
///
/// ### Responses
/// - `200 OK` with an empty body
/// - `400 Bad Request` when `file` is missing, unreadable or over `MAX_UPLOAD_BYTES`
/// - `403 Forbidden` when the caller is not an enrolled student or the due date has passed
pub async fn upload_assignment(
    State(app_state): State<AppState>,
    Path((course_id, block_id)): Path<(i64, i64)>,
    AuthUser(claims): AuthUser,
    mut multipart: Multipart,
) -> Response {
    let actor = match load_actor(&app_state, claims.sub, course_id).await {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };
    let block = BlockContext::new(app_state.fields(), BlockKey::new(course_id, block_id));

    // Refuse before touching the request body.
    match block.settings().await {
        Ok(settings) if upload_allowed(&actor, settings, Utc::now()) => {}
        Ok(_) => return error_response(StatusCode::FORBIDDEN, "Permission denied"),
        Err(e) => return service_error_response(e.into()),
    }

    let limit = config::max_upload_bytes();
    let mut upload: Option<SpooledUpload> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
        };
        if field.name() != Some("file") {
            continue;
        }
        match spool_field(field, limit).await {
            Ok(spooled) => upload = Some(spooled),
            Err(SpoolError::TooLarge) => {
                return error_response(StatusCode::BAD_REQUEST, "File exceeds the maximum upload size");
            }
            Err(SpoolError::Multipart(e)) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
            Err(SpoolError::Io(e)) => {
                tracing::error!(error = %e, "failed to spool upload");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to buffer upload");
            }
        }
        break;
    }

    let Some(upload) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing file upload");
    };

    let service = SubmissionService::new(
        app_state.storage(),
        tracing::info_span!("submission", course_id, block_id, user_id = claims.sub),
    );
    match service
        .submit_file(&actor, &block, upload.file, &upload.filename, &upload.mimetype)
        .await
    {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => service_error_response(e),
    }
}

/// Collects one part into memory, failing once it grows past `limit` bytes.
async fn read_capped(mut field: Field<'_>, limit: u64) -> Result<Vec<u8>, MalformedRequest> {
    let name = field.name().unwrap_or_default().to_string();
    let mut buf = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| MalformedRequest::Multipart(e.body_text()))?
    {
        if (buf.len() + chunk.len()) as u64 > limit {
            return Err(MalformedRequest::Multipart(format!(
                "field '{name}' exceeds {limit} bytes"
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

async fn read_text(field: Field<'_>) -> Result<String, MalformedRequest> {
    let name = field.name().unwrap_or_default().to_string();
    let bytes = read_capped(field, MAX_TEXT_FIELD_BYTES).await?;
    String::from_utf8(bytes)
        .map_err(|_| MalformedRequest::Multipart(format!("field '{name}' is not valid UTF-8")))
}

/// Reads `subject`, `message` and `file` from the relay form.
async fn collect_relay_form(
    multipart: Result<Multipart, MultipartRejection>,
    limit: u64,
) -> Result<RelayForm, MalformedRequest> {
    let malformed = |e: MultipartError| MalformedRequest::Multipart(e.body_text());
    let mut multipart = multipart.map_err(|e| MalformedRequest::Multipart(e.body_text()))?;
    let mut form = RelayForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        match field.name() {
            Some("subject") => form.subject = Some(read_text(field).await?),
            Some("message") => form.message = Some(read_text(field).await?),
            Some("file") => {
                let filename = field.file_name().unwrap_or(FALLBACK_FILENAME).to_string();
                let content_type = part_mimetype(&field, &filename);
                let bytes = read_capped(field, limit).await?;
                form.file = Some(MailAttachment {
                    filename,
                    content_type,
                    bytes,
                });
            }
            _ => continue,
        }
    }
    Ok(form)
}

fn relay_response(reply: RelayReply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut headers = HeaderMap::new();
    if !reply.content_type.is_empty() {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(reply.content_type));
    }
    (status, headers, reply.body).into_response()
}

/// POST /api/courses/{course_id}/blocks/{block_id}/relay_message
///
/// Emails `message` with the attached `file` to the mentor addresses configured for the
/// course, from the caller's address.
///
/// ### Request Body (Multipart Form Data)
/// - `subject` (string, required)
/// - `message` (string, required)
/// - `file` (file, required)
///
/// ### Responses
/// - `201 Created` with an empty body, both when delivered and when the mail server refused
///   the recipients (the refusal is recorded in `mentor_messages`)
/// - `400 Bad Request` for a missing field or malformed body: `Bad Request <detail>` as
///   plain text, or `{"error": "<detail>"}` when `Accept` includes `application/json`
/// - `500 Internal Server Error` for any other mail transport failure
pub async fn relay_message(
    State(app_state): State<AppState>,
    Path((course_id, block_id)): Path<(i64, i64)>,
    AuthUser(claims): AuthUser,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let wants_json = accepts_json(headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()));
    let actor = match load_actor(&app_state, claims.sub, course_id).await {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };

    let form = collect_relay_form(multipart, config::max_upload_bytes()).await;
    let service = RelayService::new(
        app_state.db().clone(),
        app_state.mailer(),
        tracing::info_span!("relay", course_id, block_id, user_id = claims.sub),
    );

    match service.relay_message(&actor, course_id, form).await {
        Ok(outcome) => relay_response(outcome.reply(wants_json)),
        Err(e) => service_error_response(e),
    }
}

/// POST /api/courses/{course_id}/blocks/{block_id}/save_sua
///
/// Updates the block configuration. Every field is optional; absent fields keep their
/// stored value and an explicit `null` clears `weight` or `due`.
///
/// ### Request Body
/// ```json
/// {
///   "display_name": "Essay",
///   "description": "Write 500 words",
///   "assignment_name": "essay-1",
///   "points": "20",
///   "weight": "1.5",
///   "due": "2026-11-01T12:00:00Z"
/// }
/// ```
///
/// ### Responses
/// - `200 OK` with an empty body
/// - `400 Bad Request` with `{"error": "<message>"}`, also for a body that is not a settings
///   object; nothing is saved
pub async fn save_sua(
    State(app_state): State<AppState>,
    Path((course_id, block_id)): Path<(i64, i64)>,
    payload: Result<Json<RawSettings>, JsonRejection>,
) -> Response {
    let raw = match payload {
        Ok(Json(raw)) => raw,
        Err(rejection) => return service_error_response(ServiceError::Validation(rejection.body_text())),
    };
    let block = BlockContext::new(app_state.fields(), BlockKey::new(course_id, block_id));
    let service = SettingsService::new(tracing::info_span!("settings", course_id, block_id));

    match service.save_settings(&block, raw).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => service_error_response(e),
    }
}
