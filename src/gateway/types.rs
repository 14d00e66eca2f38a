//! API response types and error codes
//!
//! - `ApiError`: status + code + message, rendered as JSON
//! - `MessageResponse`: `{message}` acknowledgement body
//! - `error_codes`: standard error code constants

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// `{"message": "..."}` acknowledgement
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "created")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error body shared by every route.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = 2002)]
    pub code: i32,
    #[schema(example = "AUTHENTICATION_FAILED")]
    pub error: &'static str,
    #[schema(example = "Invalid credentials")]
    pub message: String,
}

/// An error on its way out to the client.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: i32,
        error: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code,
            error,
            message: message.into(),
        }
    }

    /// Same error, different status. Used where a route keeps a historical
    /// status for an error kind.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            message,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            error: self.error,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Standard API error codes
pub mod error_codes {
    // Client errors (1xxx)
    pub const VALIDATION_FAILED: i32 = 1001;
    pub const DUPLICATE_USERNAME: i32 = 1101;
    pub const DUPLICATE_EMAIL: i32 = 1102;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const TOKEN_NOT_FOUND: i32 = 2003;
    pub const TOKEN_EXPIRED: i32 = 2004;
    pub const TOKEN_INVALID: i32 = 2005;
    pub const CREDENTIAL_FORMAT: i32 = 2006;

    // Resource errors (4xxx)
    pub const USER_NOT_FOUND: i32 = 4001;
    pub const CATEGORY_NOT_FOUND: i32 = 4002;
    pub const QUESTION_NOT_FOUND: i32 = 4003;
    pub const VIDEO_NOT_FOUND: i32 = 4004;
    pub const CONFLICT: i32 = 4009;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const STORAGE_ERROR: i32 = 5002;
}
