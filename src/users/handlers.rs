use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::service::UpdateUserRequest;
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, ErrorBody, MessageResponse};
use crate::user_auth::{AuthError, UserProfile};

/// Detail and update answer 400 for an unknown id; delete answers 404.
fn missing_as_bad_request(err: AuthError) -> ApiError {
    match err {
        AuthError::UserNotFound => ApiError::from(err).with_status(StatusCode::BAD_REQUEST),
        other => other.into(),
    }
}

/// List users
///
/// GET /user/
#[utoipa::path(
    get,
    path = "/user/",
    responses(
        (status = 200, description = "All users", body = Vec<UserProfile>)
    ),
    tag = "User"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    Ok(Json(state.users.list().await?))
}

/// User detail
///
/// GET /user/{user_id}
#[utoipa::path(
    get,
    path = "/user/{user_id}",
    params(("user_id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserProfile),
        (status = 400, description = "User not found", body = ErrorBody)
    ),
    tag = "User"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .users
        .get(user_id)
        .await
        .map_err(missing_as_bad_request)?;
    Ok(Json(user))
}

/// Update a user's email and username
///
/// PUT /user/{user_id}
#[utoipa::path(
    put,
    path = "/user/{user_id}",
    params(("user_id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserProfile),
        (status = 400, description = "User not found", body = ErrorBody),
        (status = 404, description = "Username or email already exists", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ErrorBody)
    ),
    tag = "User"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .users
        .update(user_id, req)
        .await
        .map_err(missing_as_bad_request)?;
    Ok(Json(user))
}

/// Delete a user and all of their sessions
///
/// DELETE /user/{user_id}
#[utoipa::path(
    delete,
    path = "/user/{user_id}",
    params(("user_id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "User"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.users.delete(user_id).await?;
    Ok(Json(MessageResponse::new("User deleted")))
}
