//! PDD backend server
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌─────────────┐    ┌──────────────────┐
//! │  Client  │───▶│ Gateway  │───▶│ AuthService │───▶│ Hasher / Codec   │
//! │  (HTTP)  │    │  (axum)  │    │  UserAdmin  │    │ Store (PG | mem) │
//! └──────────┘    └──────────┘    └─────────────┘    └──────────────────┘
//! ```
//!
//! Flags: `--env <name>` (`-e`) selects `config/<name>.yaml`, `--port <n>`
//! overrides the listen port.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use pdd_backend::config::AppConfig;
use pdd_backend::db::Database;
use pdd_backend::gateway::{self, state::AppState};
use pdd_backend::logging::init_logging;
use pdd_backend::user_auth::{
    AuthService, AuthStore, MemoryAuthStore, PgAuthStore, spawn_session_sweeper,
};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut app_config =
        AppConfig::load(&env).with_context(|| format!("Failed to load config for '{}'", env))?;
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }
    let _log_guard = init_logging(&app_config);

    tracing::info!(env = %env, version = env!("GIT_HASH"), "Starting PDD backend");

    let secret = app_config.auth.resolve_secret()?;

    let (store, db): (Arc<dyn AuthStore>, Option<Database>) = match &app_config.postgres_url {
        Some(url) => {
            let db = Database::connect(url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.init_schema().await.context("Failed to create schema")?;
            (Arc::new(PgAuthStore::new(db.clone())), Some(db))
        }
        None => {
            tracing::warn!("No postgres_url configured: users and sessions are kept in memory");
            (Arc::new(MemoryAuthStore::new()), None)
        }
    };
    tracing::info!(store = store.name(), "Auth store ready");

    let auth = Arc::new(AuthService::from_config(store, &app_config.auth, &secret)?);
    let policy = auth.policy();
    tracing::info!(
        access_ttl_minutes = policy.access_ttl.num_minutes(),
        refresh_ttl_days = policy.refresh_ttl.num_days(),
        verify_refresh_tokens = policy.verify_refresh_tokens,
        max_sessions_per_user = ?policy.max_sessions_per_user,
        "Auth policy loaded"
    );

    let sweeper = app_config
        .auth
        .session_sweep_interval_secs
        .filter(|secs| *secs > 0)
        .map(|secs| {
            tracing::info!(interval_secs = secs, "Session sweeper started");
            spawn_session_sweeper(Arc::clone(&auth), Duration::from_secs(secs))
        });

    let state = Arc::new(AppState::new(auth, db));
    let result = gateway::run_server(state, &app_config.gateway).await;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    result
}
