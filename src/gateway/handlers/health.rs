//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State};
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::ApiError;

/// Health check response data
#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_i64)]
    pub timestamp_ms: i64,
    /// Store backend answering the ping
    #[schema(example = "postgres")]
    pub store: &'static str,
    /// Build revision
    pub version: &'static str,
}

/// Health check endpoint
///
/// Pings the auth store (and the content database when configured) but
/// does not expose failure details.
///
/// - Healthy: 200 OK + `{timestamp_ms, store, version}`
/// - Unhealthy: 503 Service Unavailable
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse, content_type = "application/json"),
        (status = 503, description = "Service unavailable")
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let store = state.auth.store();
    if let Err(e) = store.ping().await {
        tracing::error!(store = store.name(), error = %e, "[HEALTH] store ping failed");
        return Err(ApiError::service_unavailable("unavailable"));
    }
    if let Some(db) = &state.db {
        if let Err(e) = db.health_check().await {
            tracing::error!(error = %e, "[HEALTH] database ping failed");
            return Err(ApiError::service_unavailable("unavailable"));
        }
    }

    Ok(Json(HealthResponse {
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
        store: store.name(),
        version: env!("GIT_HASH"),
    }))
}
