//! Authentication error types.

use axum::http::StatusCode;
use thiserror::Error;

use super::store::{StoreError, UniqueField};
use crate::gateway::types::{ApiError, error_codes};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("User already exists")]
    DuplicateUsername,

    #[error("Email already exists")]
    DuplicateEmail,

    /// Unknown user and wrong password look the same to the caller.
    #[error("Invalid credentials")]
    Authentication,

    #[error("Token not found")]
    TokenNotFound,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Credential format error: {0}")]
    CredentialFormat(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Storage error: {0}")]
    Storage(#[source] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(UniqueField::Username) => AuthError::DuplicateUsername,
            StoreError::Duplicate(UniqueField::Email) => AuthError::DuplicateEmail,
            other => AuthError::Storage(other),
        }
    }
}

impl AuthError {
    /// Get error code as i32.
    pub fn code(&self) -> i32 {
        match self {
            Self::Validation(_) => error_codes::VALIDATION_FAILED,
            Self::DuplicateUsername => error_codes::DUPLICATE_USERNAME,
            Self::DuplicateEmail => error_codes::DUPLICATE_EMAIL,
            Self::Authentication => error_codes::AUTH_FAILED,
            Self::TokenNotFound => error_codes::TOKEN_NOT_FOUND,
            Self::TokenExpired => error_codes::TOKEN_EXPIRED,
            Self::TokenInvalid => error_codes::TOKEN_INVALID,
            Self::CredentialFormat(_) => error_codes::CREDENTIAL_FORMAT,
            Self::UserNotFound => error_codes::USER_NOT_FOUND,
            Self::Storage(_) => error_codes::STORAGE_ERROR,
            Self::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Get error name string.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::DuplicateUsername => "DUPLICATE_USERNAME",
            Self::DuplicateEmail => "DUPLICATE_EMAIL",
            Self::Authentication => "AUTHENTICATION_FAILED",
            Self::TokenNotFound => "TOKEN_NOT_FOUND",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::CredentialFormat(_) => "CREDENTIAL_FORMAT",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code.
    ///
    /// Duplicate registrations answer 404 and a missing refresh token on
    /// `/auth/refresh` answers 404; clients depend on both.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DuplicateUsername | Self::DuplicateEmail => StatusCode::NOT_FOUND,
            Self::Authentication | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Self::TokenNotFound | Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::CredentialFormat(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = match &err {
            // storage details stay in the log
            AuthError::Storage(_) | AuthError::Internal(_) => {
                tracing::error!(error = %err, "auth request failed");
                "Internal server error".to_string()
            }
            _ => err.to_string(),
        };
        ApiError::new(err.http_status(), err.code(), err.name(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_store_errors_are_translated() {
        let err: AuthError = StoreError::Duplicate(UniqueField::Username).into();
        assert!(matches!(err, AuthError::DuplicateUsername));

        let err: AuthError = StoreError::Duplicate(UniqueField::Email).into();
        assert!(matches!(err, AuthError::DuplicateEmail));

        let err: AuthError = StoreError::Duplicate(UniqueField::Token).into();
        assert!(matches!(err, AuthError::Storage(_)));
    }

    #[test]
    fn test_http_status() {
        assert_eq!(
            AuthError::DuplicateUsername.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::Authentication.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::TokenNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AuthError::TokenExpired.http_status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_storage_detail_is_hidden_from_clients() {
        let err = AuthError::Storage(StoreError::Unavailable("pool timed out".into()));
        let api: ApiError = err.into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.message.contains("pool"));
    }
}
