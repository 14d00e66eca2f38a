//! User administration over the auth store.

use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use crate::user_auth::{AuthError, AuthStore, StoreHandle, UserDirectory, UserProfile};

/// Replacement identity fields for one user
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email(message = "must be a valid email address"))]
    #[schema(example = "driver@example.com")]
    pub email: String,
    #[validate(length(min = 3, max = 50, message = "must be 3-50 characters"))]
    #[schema(example = "driver1")]
    pub username: String,
}

pub struct UserAdmin {
    store: Arc<dyn AuthStore>,
}

impl UserAdmin {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    async fn handle(&self) -> Result<Box<dyn StoreHandle>, AuthError> {
        Ok(self.store.acquire().await?)
    }

    pub async fn list(&self) -> Result<Vec<UserProfile>, AuthError> {
        let mut store = self.handle().await?;
        let users = store.list_users().await?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    pub async fn get(&self, id: i64) -> Result<UserProfile, AuthError> {
        let mut store = self.handle().await?;
        store
            .find_by_id(id)
            .await?
            .map(UserProfile::from)
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn update(&self, id: i64, req: UpdateUserRequest) -> Result<UserProfile, AuthError> {
        req.validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let mut store = self.handle().await?;
        let user = store
            .update_user(id, &req.email, &req.username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        tracing::info!(user_id = id, "User updated");
        Ok(user.into())
    }

    /// Delete a user together with all of their sessions.
    pub async fn delete(&self, id: i64) -> Result<(), AuthError> {
        let mut store = self.handle().await?;
        if !store.delete_user(id).await? {
            return Err(AuthError::UserNotFound);
        }
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }
}
