use axum::http::StatusCode;
use thiserror::Error;

use crate::db::{is_foreign_key_violation, schema, unique_violation};
use crate::gateway::types::{ApiError, error_codes};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Category not found")]
    CategoryNotFound,

    #[error("Video not found")]
    VideoNotFound,

    #[error("Question not found")]
    QuestionNotFound,

    /// A question referenced a category id that does not exist.
    #[error("Category {0} does not exist")]
    UnknownCategory(i64),

    #[error("Invalid difficulty '{0}'. Allowed: easy, medium, advanced")]
    InvalidDifficulty(String),

    #[error("Category name already exists")]
    DuplicateCategory,

    #[error("Category still has questions")]
    CategoryInUse,

    #[error("Question has no correct answer option")]
    NoCorrectOption,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CatalogError {
    /// Translate constraint failures that callers can act on.
    pub fn from_write(err: sqlx::Error) -> Self {
        if unique_violation(&err).as_deref() == Some(schema::CATEGORIES_NAME_KEY) {
            return CatalogError::DuplicateCategory;
        }
        CatalogError::Database(err)
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::InvalidDifficulty(_) => error_codes::VALIDATION_FAILED,
            Self::CategoryNotFound | Self::UnknownCategory(_) => error_codes::CATEGORY_NOT_FOUND,
            Self::VideoNotFound => error_codes::VIDEO_NOT_FOUND,
            Self::QuestionNotFound => error_codes::QUESTION_NOT_FOUND,
            Self::DuplicateCategory | Self::CategoryInUse => error_codes::CONFLICT,
            Self::NoCorrectOption => error_codes::INTERNAL_ERROR,
            Self::Database(_) => error_codes::STORAGE_ERROR,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::CategoryNotFound => "CATEGORY_NOT_FOUND",
            Self::VideoNotFound => "VIDEO_NOT_FOUND",
            Self::QuestionNotFound => "QUESTION_NOT_FOUND",
            Self::UnknownCategory(_) => "UNKNOWN_CATEGORY",
            Self::InvalidDifficulty(_) => "INVALID_DIFFICULTY",
            Self::DuplicateCategory => "DUPLICATE_CATEGORY",
            Self::CategoryInUse => "CATEGORY_IN_USE",
            Self::NoCorrectOption => "NO_CORRECT_OPTION",
            Self::Database(_) => "STORAGE_ERROR",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::CategoryNotFound | Self::VideoNotFound | Self::QuestionNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::UnknownCategory(_) | Self::InvalidDifficulty(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateCategory | Self::CategoryInUse => StatusCode::CONFLICT,
            Self::NoCorrectOption | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Deleting a category that questions still point at.
pub(crate) fn map_category_delete(err: sqlx::Error) -> CatalogError {
    if is_foreign_key_violation(&err) {
        CatalogError::CategoryInUse
    } else {
        CatalogError::Database(err)
    }
}

/// Writing a question whose category is gone. Covers a category deleted
/// after the existence check as well as a bad id on replace.
pub(crate) fn map_question_write(category_id: i64) -> impl FnOnce(sqlx::Error) -> CatalogError {
    move |err| {
        if is_foreign_key_violation(&err) {
            CatalogError::UnknownCategory(category_id)
        } else {
            CatalogError::Database(err)
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let message = match &err {
            CatalogError::Database(_) => {
                tracing::error!(error = %err, "catalog request failed");
                "Internal server error".to_string()
            }
            _ => err.to_string(),
        };
        ApiError::new(err.http_status(), err.code(), err.name(), message)
    }
}
