pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    http::{Method, StatusCode, header},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::catalog::handlers as catalog;
use crate::config::GatewayConfig;
use crate::user_auth::{handlers as auth, jwt_auth_middleware};
use crate::users::handlers as users;
use state::AppState;

/// Assemble every route with its layers. Content routes are mounted only
/// when the state carries a database.
pub fn build_router(state: Arc<AppState>, config: &GatewayConfig) -> Router {
    // ==========================================================================
    // Auth Routes
    // ==========================================================================
    let protected_auth = Router::new()
        .route("/me", get(auth::me))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/refresh", post(auth::refresh))
        .merge(protected_auth);

    // ==========================================================================
    // User Administration
    // ==========================================================================
    let user_routes = Router::new()
        .route("/user", get(users::list_users))
        .route("/user/", get(users::list_users))
        .route(
            "/user/{user_id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        );

    let mut app = Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/auth", auth_routes)
        .merge(user_routes);

    // ==========================================================================
    // Content (PostgreSQL only)
    // ==========================================================================
    if state.has_catalog() {
        app = app.merge(catalog_routes());
    } else {
        tracing::warn!("Content routes disabled (PostgreSQL required)");
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    app.with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(TraceLayer::new_for_http())
}

fn catalog_routes() -> Router<Arc<AppState>> {
    // collection roots and category/video items answer with and without
    // the trailing slash
    Router::new()
        .route(
            "/category",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/category/",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/category/{category_id}",
            get(catalog::get_category)
                .put(catalog::update_category)
                .delete(catalog::delete_category),
        )
        .route(
            "/category/{category_id}/",
            get(catalog::get_category)
                .put(catalog::update_category)
                .delete(catalog::delete_category),
        )
        .route(
            "/video",
            get(catalog::list_videos).post(catalog::create_video),
        )
        .route(
            "/video/",
            get(catalog::list_videos).post(catalog::create_video),
        )
        .route(
            "/video/{video_id}",
            get(catalog::get_video)
                .put(catalog::update_video)
                .delete(catalog::delete_video),
        )
        .route(
            "/video/{video_id}/",
            get(catalog::get_video)
                .put(catalog::update_video)
                .delete(catalog::delete_video),
        )
        .route(
            "/questions",
            get(catalog::list_questions).post(catalog::create_question),
        )
        .route(
            "/questions/",
            get(catalog::list_questions).post(catalog::create_question),
        )
        .route(
            "/questions/{question_id}",
            get(catalog::get_question)
                .put(catalog::update_question)
                .delete(catalog::delete_question),
        )
}

/// Bind and serve until Ctrl-C.
pub async fn run_server(state: Arc<AppState>, config: &GatewayConfig) -> anyhow::Result<()> {
    let app = build_router(state, config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!(%addr, "Gateway listening");
    tracing::info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
