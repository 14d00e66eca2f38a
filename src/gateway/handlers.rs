//! Gateway-level handlers. Feature routes live with their modules
//! (`user_auth`, `users`, `catalog`).

pub mod health;

pub use health::{HealthResponse, health_check};
