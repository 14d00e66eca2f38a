//! PostgreSQL-backed auth store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Postgres;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgRow;

use super::models::{NewRefreshToken, NewUser, RefreshTokenRecord, UserIdentity};
use super::store::{
    AuthStore, SessionStore, StoreError, StoreHandle, UniqueField, UserDirectory,
};
use crate::db::{Database, SafeRow, is_foreign_key_violation, schema, unique_violation};

const USER_COLUMNS: &str = "id, email, username, password, created_at";
const SESSION_COLUMNS: &str = "id, token, user_id, created_at, expires_at";

fn user_from_row(row: &PgRow) -> Result<UserIdentity, sqlx::Error> {
    Ok(UserIdentity {
        id: row.get_required("id")?,
        email: row.get_required("email")?,
        username: row.get_required("username")?,
        password_hash: row.get_required("password")?,
        created_at: row.get_required("created_at")?,
    })
}

fn session_from_row(row: &PgRow) -> Result<RefreshTokenRecord, sqlx::Error> {
    Ok(RefreshTokenRecord {
        id: row.get_required("id")?,
        token: row.get_required("token")?,
        user_id: row.get_required("user_id")?,
        created_at: row.get_required("created_at")?,
        expires_at: row.get_required("expires_at")?,
    })
}

/// Map a unique-constraint failure to the column it guards.
fn map_write_error(err: sqlx::Error) -> StoreError {
    match unique_violation(&err).as_deref() {
        Some(schema::USERS_USERNAME_KEY) => StoreError::Duplicate(UniqueField::Username),
        Some(schema::USERS_EMAIL_KEY) => StoreError::Duplicate(UniqueField::Email),
        Some(schema::REFRESH_TOKEN_TOKEN_KEY) => StoreError::Duplicate(UniqueField::Token),
        Some(other) => StoreError::Duplicate(UniqueField::Other(other.to_string())),
        None if is_foreign_key_violation(&err) => {
            StoreError::MissingReference(err.to_string())
        }
        None => StoreError::Database(err),
    }
}

pub struct PgAuthStore {
    db: Database,
}

impl PgAuthStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuthStore for PgAuthStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn acquire(&self) -> Result<Box<dyn StoreHandle>, StoreError> {
        let conn = self.db.acquire().await?;
        Ok(Box::new(PgStoreHandle { conn }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.health_check().await?;
        Ok(())
    }
}

/// One pooled connection. Returned to the pool on drop.
pub struct PgStoreHandle {
    conn: PoolConnection<Postgres>,
}

impl PgStoreHandle {
    async fn fetch_user(
        &mut self,
        filter: &str,
        value: &str,
    ) -> Result<Option<UserIdentity>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, filter);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }
}

#[async_trait]
impl UserDirectory for PgStoreHandle {
    async fn find_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<UserIdentity>, StoreError> {
        self.fetch_user("username", username).await
    }

    async fn find_by_email(&mut self, email: &str) -> Result<Option<UserIdentity>, StoreError> {
        self.fetch_user("email", email).await
    }

    async fn find_by_id(&mut self, id: i64) -> Result<Option<UserIdentity>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<UserIdentity, StoreError> {
        let sql = format!(
            "INSERT INTO users (email, username, password) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .fetch_one(&mut *self.conn)
            .await
            .map_err(map_write_error)?;
        Ok(user_from_row(&row)?)
    }

    async fn list_users(&mut self) -> Result<Vec<UserIdentity>, StoreError> {
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&mut *self.conn).await?;
        Ok(rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_user(
        &mut self,
        id: i64,
        email: &str,
        username: &str,
    ) -> Result<Option<UserIdentity>, StoreError> {
        let sql = format!(
            "UPDATE users SET email = $1, username = $2 WHERE id = $3 RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(email)
            .bind(username)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(map_write_error)?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn delete_user(&mut self, id: i64) -> Result<bool, StoreError> {
        // refresh_token rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SessionStore for PgStoreHandle {
    async fn insert_session(
        &mut self,
        record: NewRefreshToken,
    ) -> Result<RefreshTokenRecord, StoreError> {
        let sql = format!(
            "INSERT INTO refresh_token (token, user_id, expires_at) VALUES ($1, $2, $3) RETURNING {}",
            SESSION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&record.token)
            .bind(record.user_id)
            .bind(record.expires_at)
            .fetch_one(&mut *self.conn)
            .await
            .map_err(map_write_error)?;
        Ok(session_from_row(&row)?)
    }

    async fn find_by_token(
        &mut self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let sql = format!("SELECT {} FROM refresh_token WHERE token = $1", SESSION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(token)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(row.as_ref().map(session_from_row).transpose()?)
    }

    async fn delete_session(&mut self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM refresh_token WHERE id = $1")
            .bind(record.id)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn list_for_user(&mut self, user_id: i64) -> Result<Vec<RefreshTokenRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM refresh_token WHERE user_id = $1 ORDER BY created_at, id",
            SESSION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(rows
            .iter()
            .map(session_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn delete_expired(&mut self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_token WHERE expires_at < $1")
            .bind(now)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }
}
