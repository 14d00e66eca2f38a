use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, error_codes};

/// Bearer guard: accepts only unexpired access tokens and makes their
/// [`Claims`](super::token::Claims) available as a request extension.
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::UNAUTHORIZED,
                error_codes::MISSING_AUTH,
                "MISSING_AUTH",
                "Missing Authorization header",
            )
        })?;

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            error_codes::TOKEN_INVALID,
            "TOKEN_INVALID",
            "Invalid token format",
        ));
    };

    let claims = state.auth.verify_access_token(token.trim()).inspect_err(|e| {
        tracing::debug!(error = %e, "Bearer token rejected");
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
