//! User administration routes (`/user`).

pub mod handlers;
pub mod service;

pub use service::{UpdateUserRequest, UserAdmin};
