//! Token-based authentication and session lifecycle.
//!
//! ## Components
//! - `password`: Argon2id credential hashing
//! - `token`: JWT encode/decode
//! - `store`: per-request store handle traits
//! - `repository`: PostgreSQL store
//! - `memory`: in-process store
//! - `service`: register / login / refresh / logout
//! - `handlers`: `/auth` routes
//! - `middleware`: bearer guard
//! - `sweeper`: expired-session cleanup task

pub mod error;
pub mod handlers;
pub mod memory;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod store;
pub mod sweeper;
pub mod token;

pub use error::AuthError;
pub use memory::MemoryAuthStore;
pub use middleware::jwt_auth_middleware;
pub use models::{TokenPair, UserIdentity, UserProfile};
pub use password::CredentialHasher;
pub use repository::PgAuthStore;
pub use service::{AuthPolicy, AuthService};
pub use store::{AuthStore, SessionStore, StoreError, StoreHandle, UserDirectory};
pub use sweeper::spawn_session_sweeper;
pub use token::{Claims, TokenCodec, TokenUse};
