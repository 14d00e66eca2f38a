//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8000/docs`
//! - OpenAPI JSON: `http://localhost:8000/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::catalog::models::{
    AnswerOptionInput, AnswerOptionOut, Category, CategoryInput, Difficulty, QuestionCreated,
    QuestionDetail, QuestionInput, QuestionListItem, QuestionListResponse, Video, VideoInput,
};
use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{ErrorBody, MessageResponse};
use crate::user_auth::models::{
    AccessTokenResponse, LoginForm, RefreshTokenParams, RegisterRequest, TokenPair, UserProfile,
};
use crate::users::UpdateUserRequest;

/// JWT bearer security scheme for `/auth/me`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let bearer = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("JWT")
                .description(Some("Access token from POST /auth/login or POST /auth/refresh"))
                .build();
            components.add_security_scheme("bearer_auth", SecurityScheme::Http(bearer));
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "PDD Learning Platform API",
        version = "1.0.0",
        description = "Accounts, token sessions and driving-rules study content.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        // Auth
        crate::user_auth::handlers::register,
        crate::user_auth::handlers::login,
        crate::user_auth::handlers::logout,
        crate::user_auth::handlers::refresh,
        crate::user_auth::handlers::me,
        // User administration
        crate::users::handlers::list_users,
        crate::users::handlers::get_user,
        crate::users::handlers::update_user,
        crate::users::handlers::delete_user,
        // Content
        crate::catalog::handlers::create_category,
        crate::catalog::handlers::list_categories,
        crate::catalog::handlers::get_category,
        crate::catalog::handlers::update_category,
        crate::catalog::handlers::delete_category,
        crate::catalog::handlers::create_video,
        crate::catalog::handlers::list_videos,
        crate::catalog::handlers::get_video,
        crate::catalog::handlers::update_video,
        crate::catalog::handlers::delete_video,
        crate::catalog::handlers::list_questions,
        crate::catalog::handlers::get_question,
        crate::catalog::handlers::create_question,
        crate::catalog::handlers::update_question,
        crate::catalog::handlers::delete_question,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorBody,
            MessageResponse,
            RegisterRequest,
            LoginForm,
            RefreshTokenParams,
            TokenPair,
            AccessTokenResponse,
            UserProfile,
            UpdateUserRequest,
            Category,
            CategoryInput,
            Video,
            VideoInput,
            Difficulty,
            AnswerOptionInput,
            AnswerOptionOut,
            QuestionInput,
            QuestionListItem,
            QuestionListResponse,
            QuestionDetail,
            QuestionCreated,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token sessions"),
        (name = "User", description = "User administration"),
        (name = "Category", description = "Question categories"),
        (name = "Video", description = "Instructional videos"),
        (name = "Questions", description = "Questions and answer options"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;
