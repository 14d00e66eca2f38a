use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sqlx::PgPool;
use std::sync::Arc;
use validator::Validate;

use super::error::CatalogError;
use super::models::{
    Category, CategoryInput, Difficulty, QuestionCreated, QuestionDetail, QuestionFilter,
    QuestionInput, QuestionListResponse, Video, VideoInput,
};
use super::repository::{CategoryRepository, QuestionRepository, VideoRepository};
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, ErrorBody, MessageResponse};

fn pool(state: &AppState) -> Result<&PgPool, ApiError> {
    state
        .db
        .as_ref()
        .map(|db| db.pool())
        .ok_or_else(|| ApiError::service_unavailable("Content storage is not configured"))
}

fn validated<T: Validate>(input: T) -> Result<T, CatalogError> {
    input
        .validate()
        .map_err(|e| CatalogError::Validation(e.to_string()))?;
    Ok(input)
}

// ============================================================================
// Categories
// ============================================================================

#[utoipa::path(
    post,
    path = "/category/",
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Category name already exists", body = ErrorBody)
    ),
    tag = "Category"
)]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let input = validated(input)?;
    let category = CategoryRepository::create(pool(&state)?, &input.category_name).await?;
    tracing::info!(category_id = category.id, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/category/",
    responses((status = 200, description = "All categories", body = Vec<Category>)),
    tag = "Category"
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(CategoryRepository::list(pool(&state)?).await?))
}

#[utoipa::path(
    get,
    path = "/category/{category_id}",
    params(("category_id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category", body = Category),
        (status = 404, description = "Category not found", body = ErrorBody)
    ),
    tag = "Category"
)]
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(CategoryRepository::get(pool(&state)?, category_id).await?))
}

#[utoipa::path(
    put,
    path = "/category/{category_id}",
    params(("category_id" = i64, Path, description = "Category id")),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Updated", body = MessageResponse),
        (status = 404, description = "Category not found", body = ErrorBody)
    ),
    tag = "Category"
)]
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<i64>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    let input = validated(input)?;
    CategoryRepository::rename(pool(&state)?, category_id, &input.category_name).await?;
    Ok(Json(MessageResponse::new("Updated")))
}

#[utoipa::path(
    delete,
    path = "/category/{category_id}",
    params(("category_id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Category not found", body = ErrorBody),
        (status = 409, description = "Category still has questions", body = ErrorBody)
    ),
    tag = "Category"
)]
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    CategoryRepository::delete(pool(&state)?, category_id).await?;
    tracing::info!(category_id, "Category deleted");
    Ok(Json(MessageResponse::new("Deleted")))
}

// ============================================================================
// Videos
// ============================================================================

#[utoipa::path(
    post,
    path = "/video/",
    request_body = VideoInput,
    responses((status = 200, description = "Video created", body = Video)),
    tag = "Video"
)]
pub async fn create_video(
    State(state): State<Arc<AppState>>,
    Json(input): Json<VideoInput>,
) -> Result<Json<Video>, ApiError> {
    let input = validated(input)?;
    let video = VideoRepository::create(pool(&state)?, &input).await?;
    tracing::info!(video_id = video.id, "Video created");
    Ok(Json(video))
}

#[utoipa::path(
    get,
    path = "/video/",
    responses((status = 200, description = "All videos", body = Vec<Video>)),
    tag = "Video"
)]
pub async fn list_videos(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Video>>, ApiError> {
    Ok(Json(VideoRepository::list(pool(&state)?).await?))
}

#[utoipa::path(
    get,
    path = "/video/{video_id}",
    params(("video_id" = i64, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video", body = Video),
        (status = 404, description = "Video not found", body = ErrorBody)
    ),
    tag = "Video"
)]
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<i64>,
) -> Result<Json<Video>, ApiError> {
    Ok(Json(VideoRepository::get(pool(&state)?, video_id).await?))
}

#[utoipa::path(
    put,
    path = "/video/{video_id}",
    params(("video_id" = i64, Path, description = "Video id")),
    request_body = VideoInput,
    responses(
        (status = 200, description = "Video updated", body = MessageResponse),
        (status = 404, description = "Video not found", body = ErrorBody)
    ),
    tag = "Video"
)]
pub async fn update_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<i64>,
    Json(input): Json<VideoInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    let input = validated(input)?;
    VideoRepository::update(pool(&state)?, video_id, &input).await?;
    Ok(Json(MessageResponse::new("Video updated")))
}

#[utoipa::path(
    delete,
    path = "/video/{video_id}",
    params(("video_id" = i64, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video deleted", body = MessageResponse),
        (status = 404, description = "Video not found", body = ErrorBody)
    ),
    tag = "Video"
)]
pub async fn delete_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    VideoRepository::delete(pool(&state)?, video_id).await?;
    Ok(Json(MessageResponse::new("Video deleted")))
}

// ============================================================================
// Questions
// ============================================================================

#[utoipa::path(
    get,
    path = "/questions",
    params(QuestionFilter),
    responses(
        (status = 200, description = "Questions with answer options", body = QuestionListResponse),
        (status = 400, description = "Unknown difficulty", body = ErrorBody)
    ),
    tag = "Questions"
)]
pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<QuestionFilter>,
) -> Result<Json<QuestionListResponse>, ApiError> {
    let difficulty = filter
        .difficulty
        .as_deref()
        .filter(|d| !d.is_empty())
        .map(|d| d.parse::<Difficulty>())
        .transpose()
        .map_err(CatalogError::InvalidDifficulty)?;
    let category = filter.category.as_deref().filter(|c| !c.is_empty());

    let items = QuestionRepository::list(pool(&state)?, category, difficulty).await?;
    Ok(Json(QuestionListResponse { items }))
}

#[utoipa::path(
    get,
    path = "/questions/{question_id}",
    params(("question_id" = i64, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question with its correct option", body = QuestionDetail),
        (status = 404, description = "Question not found", body = ErrorBody),
        (status = 500, description = "Question has no correct option", body = ErrorBody)
    ),
    tag = "Questions"
)]
pub async fn get_question(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<i64>,
) -> Result<Json<QuestionDetail>, ApiError> {
    Ok(Json(QuestionRepository::detail(pool(&state)?, question_id).await?))
}

#[utoipa::path(
    post,
    path = "/questions/",
    request_body = QuestionInput,
    responses(
        (status = 201, description = "Question created", body = QuestionCreated),
        (status = 400, description = "Category does not exist", body = ErrorBody)
    ),
    tag = "Questions"
)]
pub async fn create_question(
    State(state): State<Arc<AppState>>,
    Json(input): Json<QuestionInput>,
) -> Result<(StatusCode, Json<QuestionCreated>), ApiError> {
    let input = validated(input)?;
    let question_id = QuestionRepository::create(pool(&state)?, &input).await?;
    tracing::info!(question_id, category_id = input.category_id, "Question created");
    Ok((
        StatusCode::CREATED,
        Json(QuestionCreated {
            message: "Question created".to_string(),
            question_id,
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/questions/{question_id}",
    params(("question_id" = i64, Path, description = "Question id")),
    request_body = QuestionInput,
    responses(
        (status = 200, description = "Question replaced", body = MessageResponse),
        (status = 400, description = "Category does not exist", body = ErrorBody),
        (status = 404, description = "Question not found", body = ErrorBody)
    ),
    tag = "Questions"
)]
pub async fn update_question(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<i64>,
    Json(input): Json<QuestionInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    let input = validated(input)?;
    QuestionRepository::replace(pool(&state)?, question_id, &input).await?;
    Ok(Json(MessageResponse::new("Question updated")))
}

#[utoipa::path(
    delete,
    path = "/questions/{question_id}",
    params(("question_id" = i64, Path, description = "Question id")),
    responses(
        (status = 204, description = "Question deleted"),
        (status = 404, description = "Question not found", body = ErrorBody)
    ),
    tag = "Questions"
)]
pub async fn delete_question(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    QuestionRepository::delete(pool(&state)?, question_id).await?;
    tracing::info!(question_id, "Question deleted");
    Ok(StatusCode::NO_CONTENT)
}
