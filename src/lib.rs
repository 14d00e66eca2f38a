//! PDD - driving-rules learning platform backend
//!
//! # Modules
//!
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup
//! - [`db`] - PostgreSQL pool and schema bootstrap
//! - [`user_auth`] - password hashing, JWT sessions, auth service
//! - [`users`] - user administration
//! - [`catalog`] - categories, videos, questions
//! - [`gateway`] - HTTP router, OpenAPI, shared state

pub mod config;
pub mod logging;

// Storage
pub mod db;

// Features
pub mod catalog;
pub mod user_auth;
pub mod users;

// HTTP
pub mod gateway;

// Convenient re-exports at crate root
pub use config::{AppConfig, AuthConfig, ConfigError, GatewayConfig};
pub use gateway::{build_router, run_server, state::AppState};
pub use user_auth::{AuthError, AuthService, MemoryAuthStore, PgAuthStore};
