//! Store seams for the auth core.
//!
//! The auth service never talks to a database directly. It acquires one
//! [`StoreHandle`] per request from an [`AuthStore`], runs every read and
//! write of that request through it, and lets it drop on the way out.
//! Dropping the handle returns the underlying connection, so release happens
//! on success, on business errors and on `?` early returns alike.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use super::models::{NewRefreshToken, NewUser, RefreshTokenRecord, UserIdentity};

/// Column whose uniqueness constraint rejected a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
    Token,
    Other(String),
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Username => write!(f, "username"),
            UniqueField::Email => write!(f, "email"),
            UniqueField::Token => write!(f, "token"),
            UniqueField::Other(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate value for {0}")]
    Duplicate(UniqueField),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A write pointed at a row that does not exist.
    #[error("Missing referenced row: {0}")]
    MissingReference(String),
}

/// User identity records.
#[async_trait]
pub trait UserDirectory: Send {
    async fn find_by_username(&mut self, username: &str)
    -> Result<Option<UserIdentity>, StoreError>;

    async fn find_by_email(&mut self, email: &str) -> Result<Option<UserIdentity>, StoreError>;

    async fn find_by_id(&mut self, id: i64) -> Result<Option<UserIdentity>, StoreError>;

    /// Insert a user. A username or email clash fails with
    /// [`StoreError::Duplicate`] even if an earlier lookup saw no clash.
    async fn insert_user(&mut self, user: NewUser) -> Result<UserIdentity, StoreError>;

    async fn list_users(&mut self) -> Result<Vec<UserIdentity>, StoreError>;

    /// Returns `None` when no user has this id.
    async fn update_user(
        &mut self,
        id: i64,
        email: &str,
        username: &str,
    ) -> Result<Option<UserIdentity>, StoreError>;

    /// Delete a user and every refresh token it owns. Returns false when
    /// no user has this id.
    async fn delete_user(&mut self, id: i64) -> Result<bool, StoreError>;
}

/// Persisted refresh tokens.
#[async_trait]
pub trait SessionStore: Send {
    async fn insert_session(
        &mut self,
        record: NewRefreshToken,
    ) -> Result<RefreshTokenRecord, StoreError>;

    async fn find_by_token(&mut self, token: &str)
    -> Result<Option<RefreshTokenRecord>, StoreError>;

    async fn delete_session(&mut self, record: &RefreshTokenRecord) -> Result<(), StoreError>;

    /// Sessions of one user, oldest first.
    async fn list_for_user(&mut self, user_id: i64) -> Result<Vec<RefreshTokenRecord>, StoreError>;

    /// Delete sessions whose `expires_at` is before `now`. Returns the count.
    async fn delete_expired(&mut self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// One request's view of both stores, backed by a single connection.
pub trait StoreHandle: UserDirectory + SessionStore {}

impl<T: UserDirectory + SessionStore> StoreHandle for T {}

/// Source of per-request store handles.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    async fn acquire(&self) -> Result<Box<dyn StoreHandle>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
