use crate::auth::claims::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, Path, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use db::models::{user::Model as UserModel, user_course_role::Model as RoleModel};
use std::collections::HashMap;

#[derive(serde::Serialize, Default)]
pub struct Empty;

type GuardRejection = (StatusCode, Json<ApiResponse<Empty>>);

fn reject(status: StatusCode, message: &str) -> GuardRejection {
    (status, Json(ApiResponse::error(message)))
}

/// Validates the bearer token and stores the `AuthUser` in the request extensions.
async fn extract_and_insert_authuser(
    req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), GuardRejection> {
    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| reject(StatusCode::UNAUTHORIZED, "Authentication required"))?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// Basic guard to ensure the request is authenticated.
pub async fn allow_authenticated(req: Request<Body>, next: Next) -> Result<Response, GuardRejection> {
    let (req, _user) = extract_and_insert_authuser(req).await?;
    Ok(next.run(req).await)
}

/// Requires an instructor or staff role in the `{course_id}` of the route.
///
/// Tokens carrying the admin claim pass only when the stored user is still an administrator.
pub async fn allow_staff(
    State(app_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, GuardRejection> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    let course_id = params
        .get("course_id")
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "Missing or invalid course_id"))?;

    if user.0.admin {
        return match UserModel::get_by_id(app_state.db(), user.0.sub).await {
            Ok(Some(account)) if account.admin => Ok(next.run(req).await),
            Ok(_) => Err(reject(StatusCode::FORBIDDEN, "Administrator access required")),
            Err(e) => {
                tracing::warn!(error = %e, user_id = user.0.sub, "DB error while checking admin; denying access");
                Err(reject(StatusCode::FORBIDDEN, "Unable to verify administrator"))
            }
        };
    }

    match RoleModel::find_role(app_state.db(), user.0.sub, course_id).await {
        Ok(Some(role)) if role.is_staff() => Ok(next.run(req).await),
        Ok(_) => Err(reject(
            StatusCode::FORBIDDEN,
            "Instructor or staff access required for this course",
        )),
        Err(e) => {
            tracing::warn!(
                error = %e,
                user_id = user.0.sub,
                course_id,
                "DB error while checking role; denying access"
            );
            Err(reject(StatusCode::FORBIDDEN, "Unable to verify course role"))
        }
    }
}
