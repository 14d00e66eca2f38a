//! HTTP-level tests for the auth and user routes, run against the
//! in-memory store.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use pdd_backend::config::{Argon2Config, AuthConfig, GatewayConfig};
use pdd_backend::{AppState, AuthService, MemoryAuthStore, build_router};

struct TestApp {
    router: Router,
    store: MemoryAuthStore,
}

fn app_with(auth_config: AuthConfig) -> TestApp {
    let store = MemoryAuthStore::new();
    let auth = AuthService::from_config(Arc::new(store.clone()), &auth_config, "test-secret")
        .expect("auth service");
    let state = Arc::new(AppState::new(Arc::new(auth), None));
    let gateway = GatewayConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 10,
        max_body_bytes: 64 * 1024,
    };
    TestApp {
        router: build_router(state, &gateway),
        store,
    }
}

fn cheap_auth() -> AuthConfig {
    AuthConfig {
        argon2: Argon2Config {
            memory_kib: 64,
            iterations: 1,
            lanes: 1,
        },
        ..AuthConfig::default()
    }
}

fn app() -> TestApp {
    app_with(cheap_auth())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn form_post(uri: &str, form: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

fn empty_post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

async fn register(router: &Router, username: &str, email: &str) -> (StatusCode, Value) {
    send(
        router,
        json_post(
            "/auth/register",
            json!({"email": email, "username": username, "password": "password123"}),
        ),
    )
    .await
}

async fn login(router: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    send(
        router,
        form_post(
            "/auth/login",
            &format!("username={}&password={}", username, password),
        ),
    )
    .await
}

#[tokio::test]
async fn test_register_and_login() {
    let app = app();

    let (status, body) = register(&app.router, "driver1", "driver1@example.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "created");

    let (status, body) = login(&app.router, "driver1", "password123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());
    assert_eq!(app.store.session_count(), 1);
    assert_eq!(app.store.open_handles(), 0);
}

#[tokio::test]
async fn test_duplicate_registration_is_404() {
    let app = app();
    register(&app.router, "driver1", "driver1@example.com").await;

    let (status, body) = register(&app.router, "driver1", "other@example.com").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "DUPLICATE_USERNAME");

    let (status, body) = register(&app.router, "driver2", "driver1@example.com").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "DUPLICATE_EMAIL");
    assert_eq!(app.store.user_count(), 1);
}

#[tokio::test]
async fn test_invalid_registration_is_422() {
    let app = app();
    let (status, body) = register(&app.router, "driver1", "not-an-email").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_bad_credentials_are_401() {
    let app = app();
    register(&app.router, "driver1", "driver1@example.com").await;

    let (wrong_status, wrong_body) = login(&app.router, "driver1", "nope").await;
    let (ghost_status, ghost_body) = login(&app.router, "ghost", "password123").await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(ghost_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, ghost_body);
    assert_eq!(app.store.session_count(), 0);
}

#[tokio::test]
async fn test_refresh_logout_cycle() {
    let app = app();
    register(&app.router, "driver1", "driver1@example.com").await;
    let (_, tokens) = login(&app.router, "driver1", "password123").await;
    let refresh_token = tokens["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app.router,
        empty_post(&format!("/auth/refresh?refresh_token={}", refresh_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert!(body.get("refresh_token").is_none());

    // JSON body works as well as the query string
    let (status, _) = send(
        &app.router,
        json_post("/auth/logout", json!({"refresh_token": refresh_token})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app.router,
        empty_post(&format!("/auth/refresh?refresh_token={}", refresh_token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "TOKEN_NOT_FOUND");

    let (status, _) = send(
        &app.router,
        empty_post(&format!("/auth/logout?refresh_token={}", refresh_token)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_without_token_is_422() {
    let app = app();
    let (status, _) = send(&app.router, empty_post("/auth/refresh")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_me_requires_access_token() {
    let app = app();
    register(&app.router, "driver1", "driver1@example.com").await;
    let (_, tokens) = login(&app.router, "driver1", "password123").await;

    let me = |token: &str| {
        Request::get("/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(&app.router, me(tokens["access_token"].as_str().unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "driver1");
    assert!(body.get("password_hash").is_none());

    let (status, _) = send(&app.router, me(tokens["refresh_token"].as_str().unwrap())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app.router,
        Request::get("/auth/me").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "MISSING_AUTH");
}

#[tokio::test]
async fn test_expired_refresh_token_is_401_in_strict_mode() {
    let app = app_with(AuthConfig {
        refresh_token_expire_days: 0,
        ..cheap_auth()
    });
    register(&app.router, "driver1", "driver1@example.com").await;
    let (_, tokens) = login(&app.router, "driver1", "password123").await;
    let refresh_token = tokens["refresh_token"].as_str().unwrap();

    // zero lifetime: exp == iat, expired one second later
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    let (status, body) = send(
        &app.router,
        empty_post(&format!("/auth/refresh?refresh_token={}", refresh_token)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "TOKEN_EXPIRED");
    assert_eq!(app.store.session_count(), 0);
}

#[tokio::test]
async fn test_user_admin_routes() {
    let app = app();
    register(&app.router, "driver1", "driver1@example.com").await;
    register(&app.router, "driver2", "driver2@example.com").await;
    login(&app.router, "driver1", "password123").await;

    let (status, body) = send(&app.router, Request::get("/user/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 2);
    let id = users[0]["id"].as_i64().unwrap();

    let (status, _) = send(&app.router, Request::get("/user/999").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app.router,
        Request::put(format!("/user/{}", id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"email": "renamed@example.com", "username": "driver2"}).to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "DUPLICATE_USERNAME");

    let (status, _) = send(
        &app.router,
        Request::delete(format!("/user/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.user_count(), 1);
    assert_eq!(app.store.session_count(), 0);

    let (status, _) = send(
        &app.router,
        Request::delete(format!("/user/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_catalog_without_database() {
    let app = app();

    let (status, body) = send(&app.router, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "memory");

    app.store.set_unavailable(true);
    let (status, _) = send(&app.router, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // content routes are not mounted in memory mode
    let (status, _) = send(
        &app.router,
        Request::get("/questions").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = app();
    let (status, body) = send(
        &app.router,
        Request::get("/api-docs/openapi.json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/auth/login").is_some());
}
