use axum::{
    Extension, Form, Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::error::AuthError;
use super::models::{
    AccessTokenResponse, LoginForm, RefreshTokenParams, RegisterRequest, TokenPair, UserProfile,
};
use super::token::Claims;
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, ErrorBody, MessageResponse};

/// Pull `refresh_token` from the query string, falling back to a JSON body.
fn refresh_token_from(params: RefreshTokenParams, body: &Bytes) -> Result<String, AuthError> {
    if let Some(token) = params.refresh_token.filter(|t| !t.is_empty()) {
        return Ok(token);
    }
    if !body.is_empty() {
        let parsed: RefreshTokenParams = serde_json::from_slice(body)
            .map_err(|e| AuthError::Validation(format!("invalid JSON body: {}", e)))?;
        if let Some(token) = parsed.refresh_token.filter(|t| !t.is_empty()) {
            return Ok(token);
        }
    }
    Err(AuthError::Validation("refresh_token is required".to_string()))
}

/// Register a new user
///
/// POST /auth/register
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User created", body = MessageResponse),
        (status = 404, description = "Username or email already exists", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.register(req).await?;
    Ok(Json(MessageResponse::new("created")))
}

/// Log in with a form-encoded username and password
///
/// POST /auth/login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenPair>, ApiError> {
    let pair = state.auth.login(&form.username, &form.password).await?;
    Ok(Json(pair))
}

/// Revoke one session
///
/// POST /auth/logout
#[utoipa::path(
    post,
    path = "/auth/logout",
    params(RefreshTokenParams),
    request_body(content = RefreshTokenParams, description = "Alternative to the query parameter"),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Token not found", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RefreshTokenParams>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = refresh_token_from(params, &body)?;
    match state.auth.logout(&token).await {
        Ok(()) => Ok(Json(MessageResponse::new("Logged out successfully"))),
        // logout has always answered 401 here, refresh answers 404
        Err(AuthError::TokenNotFound) => {
            Err(ApiError::from(AuthError::TokenNotFound).with_status(StatusCode::UNAUTHORIZED))
        }
        Err(e) => Err(e.into()),
    }
}

/// Mint a new access token from a refresh token
///
/// POST /auth/refresh
#[utoipa::path(
    post,
    path = "/auth/refresh",
    params(RefreshTokenParams),
    request_body(content = RefreshTokenParams, description = "Alternative to the query parameter"),
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Refresh token expired or invalid", body = ErrorBody),
        (status = 404, description = "Token not found", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RefreshTokenParams>,
    body: Bytes,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let token = refresh_token_from(params, &body)?;
    let response = state.auth.refresh(&token).await?;
    Ok(Json(response))
}

/// Profile of the caller
///
/// GET /auth/me
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.auth.current_user(&claims).await.map_err(|e| match e {
        // token outlived its user
        AuthError::UserNotFound => ApiError::from(AuthError::TokenInvalid),
        other => other.into(),
    })?;
    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_wins_over_body() {
        let params = RefreshTokenParams {
            refresh_token: Some("from-query".to_string()),
        };
        let body = Bytes::from_static(br#"{"refresh_token":"from-body"}"#);
        assert_eq!(refresh_token_from(params, &body).unwrap(), "from-query");
    }

    #[test]
    fn test_body_fallback() {
        let body = Bytes::from_static(br#"{"refresh_token":"from-body"}"#);
        assert_eq!(
            refresh_token_from(RefreshTokenParams::default(), &body).unwrap(),
            "from-body"
        );
    }

    #[test]
    fn test_missing_token_is_validation_error() {
        let err = refresh_token_from(RefreshTokenParams::default(), &Bytes::new()).unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        let err = refresh_token_from(RefreshTokenParams::default(), &Bytes::from_static(b"{"))
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }
}
