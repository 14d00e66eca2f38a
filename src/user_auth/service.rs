use chrono::{Duration, Utc};
use std::sync::Arc;
use validator::Validate;

use super::error::AuthError;
use super::models::{
    AccessTokenResponse, NewRefreshToken, NewUser, RegisterRequest, TOKEN_TYPE_BEARER, TokenPair,
    UserProfile,
};
use super::password::CredentialHasher;
use super::store::{AuthStore, SessionStore, StoreHandle, UserDirectory};
use super::token::{Claims, TokenCodec, TokenUse, parse_algorithm};
use crate::config::{AuthConfig, ConfigError};

/// Token lifetimes and session rules.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub verify_refresh_tokens: bool,
    pub max_sessions_per_user: Option<u32>,
}

impl AuthPolicy {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            access_ttl: Duration::minutes(config.access_token_expire_minutes),
            refresh_ttl: Duration::days(config.refresh_token_expire_days),
            verify_refresh_tokens: config.verify_refresh_tokens,
            max_sessions_per_user: config.max_sessions_per_user,
        }
    }
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self::from_config(&AuthConfig::default())
    }
}

/// Registration, login, refresh and logout.
///
/// Holds no per-user state. Each call acquires one store handle, does all
/// of its reads and writes through it and drops it before returning.
pub struct AuthService {
    store: Arc<dyn AuthStore>,
    hasher: CredentialHasher,
    codec: TokenCodec,
    policy: AuthPolicy,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn AuthStore>,
        hasher: CredentialHasher,
        codec: TokenCodec,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            store,
            hasher,
            codec,
            policy,
        }
    }

    /// Build from config with an already resolved signing secret.
    pub fn from_config(
        store: Arc<dyn AuthStore>,
        config: &AuthConfig,
        secret: &str,
    ) -> Result<Self, ConfigError> {
        if config.max_sessions_per_user == Some(0) {
            return Err(ConfigError::SessionCap);
        }
        let algorithm = parse_algorithm(&config.algorithm)?;
        let hasher = CredentialHasher::new(config.prehash_passwords, &config.argon2)
            .map_err(|e| ConfigError::WorkFactor(e.to_string()))?;
        Ok(Self::new(
            store,
            hasher,
            TokenCodec::new(secret, algorithm),
            AuthPolicy::from_config(config),
        ))
    }

    pub fn store(&self) -> &Arc<dyn AuthStore> {
        &self.store
    }

    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    async fn handle(&self) -> Result<Box<dyn StoreHandle>, AuthError> {
        Ok(self.store.acquire().await?)
    }

    /// Create a user. Username clashes are reported before email clashes.
    pub async fn register(&self, req: RegisterRequest) -> Result<(), AuthError> {
        req.validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let mut store = self.handle().await?;

        if store.find_by_username(&req.username).await?.is_some() {
            tracing::warn!(username = %req.username, "Registration rejected: username taken");
            return Err(AuthError::DuplicateUsername);
        }
        if store.find_by_email(&req.email).await?.is_some() {
            tracing::warn!(username = %req.username, "Registration rejected: email taken");
            return Err(AuthError::DuplicateEmail);
        }

        let hasher = self.hasher.clone();
        let password = req.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hash task failed: {}", e)))??;

        // a concurrent registration can still win between the checks and here;
        // the store reports that as Duplicate and it converts like the checks above
        let user = store
            .insert_user(NewUser {
                email: req.email,
                username: req.username,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(())
    }

    /// Check credentials and open a new session.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let mut store = self.handle().await?;

        let Some(user) = store.find_by_username(username).await? else {
            tracing::warn!(username = %username, "Login failed: unknown user");
            return Err(AuthError::Authentication);
        };

        let hasher = self.hasher.clone();
        let plaintext = password.to_string();
        let digest = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest))
            .await
            .map_err(|e| AuthError::Internal(format!("verify task failed: {}", e)))?
            .inspect_err(|e| {
                tracing::error!(user_id = user.id, error = %e, "Stored password hash unreadable")
            })?;
        if !matches {
            tracing::warn!(user_id = user.id, "Login failed: wrong password");
            return Err(AuthError::Authentication);
        }

        let access_token = self
            .codec
            .encode(&user.username, TokenUse::Access, self.policy.access_ttl)?;
        let refresh_token =
            self.codec
                .encode(&user.username, TokenUse::Refresh, self.policy.refresh_ttl)?;

        store
            .insert_session(NewRefreshToken {
                token: refresh_token.clone(),
                user_id: user.id,
                expires_at: Utc::now() + self.policy.refresh_ttl,
            })
            .await?;

        if let Some(cap) = self.policy.max_sessions_per_user {
            enforce_session_cap(store.as_mut(), user.id, cap).await?;
        }

        tracing::info!(user_id = user.id, "User logged in");
        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: TOKEN_TYPE_BEARER,
        })
    }

    /// Mint a new access token from a stored refresh token. The refresh
    /// token itself is not rotated.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessTokenResponse, AuthError> {
        let mut store = self.handle().await?;

        let Some(record) = store.find_by_token(refresh_token).await? else {
            tracing::warn!("Refresh rejected: token not found");
            return Err(AuthError::TokenNotFound);
        };

        if self.policy.verify_refresh_tokens {
            match self.codec.decode(&record.token) {
                Ok(claims) if claims.token_use == TokenUse::Refresh => {}
                Ok(_) => return Err(AuthError::TokenInvalid),
                Err(AuthError::TokenExpired) => {
                    store.delete_session(&record).await?;
                    tracing::info!(user_id = record.user_id, "Expired session removed on refresh");
                    return Err(AuthError::TokenExpired);
                }
                Err(e) => return Err(e),
            }
        }

        let user = store
            .find_by_id(record.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let access_token = self
            .codec
            .encode(&user.username, TokenUse::Access, self.policy.access_ttl)?;

        tracing::debug!(user_id = user.id, "Access token refreshed");
        Ok(AccessTokenResponse {
            access_token,
            token_type: TOKEN_TYPE_BEARER,
        })
    }

    /// Revoke the one session this refresh token belongs to.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let mut store = self.handle().await?;

        let Some(record) = store.find_by_token(refresh_token).await? else {
            tracing::warn!("Logout rejected: token not found");
            return Err(AuthError::TokenNotFound);
        };
        store.delete_session(&record).await?;

        tracing::info!(user_id = record.user_id, "User logged out");
        Ok(())
    }

    /// Decode a bearer token and accept it only as an access token.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.codec.decode(token)?;
        if claims.token_use != TokenUse::Access {
            return Err(AuthError::TokenInvalid);
        }
        Ok(claims)
    }

    pub async fn current_user(&self, claims: &Claims) -> Result<UserProfile, AuthError> {
        let mut store = self.handle().await?;
        store
            .find_by_username(&claims.sub)
            .await?
            .map(UserProfile::from)
            .ok_or(AuthError::UserNotFound)
    }

    /// Delete every session whose refresh token has expired.
    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        let mut store = self.handle().await?;
        Ok(store.delete_expired(Utc::now()).await?)
    }
}

async fn enforce_session_cap(
    store: &mut dyn StoreHandle,
    user_id: i64,
    cap: u32,
) -> Result<(), AuthError> {
    // the session just created always survives
    let cap = cap.max(1) as usize;
    let sessions = store.list_for_user(user_id).await?;
    let excess = sessions.len().saturating_sub(cap);
    for record in sessions.iter().take(excess) {
        store.delete_session(record).await?;
    }
    if excess > 0 {
        tracing::info!(user_id, evicted = excess, "Session cap reached, oldest sessions dropped");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_auth::memory::MemoryAuthStore;
    use crate::user_auth::password::test_hasher;
    use jsonwebtoken::Algorithm;

    const SECRET: &str = "test-secret";

    fn service_with(store: &MemoryAuthStore, policy: AuthPolicy) -> AuthService {
        AuthService::new(
            Arc::new(store.clone()),
            test_hasher(),
            TokenCodec::new(SECRET, Algorithm::HS256),
            policy,
        )
    }

    fn service(store: &MemoryAuthStore) -> AuthService {
        service_with(store, AuthPolicy::default())
    }

    fn register_req(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: "password123".to_string(),
        }
    }

    async fn registered(store: &MemoryAuthStore, username: &str) -> AuthService {
        let svc = service(store);
        svc.register(register_req(username, &format!("{}@example.com", username)))
            .await
            .unwrap();
        svc
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryAuthStore::new();
        let svc = registered(&store, "driver1").await;

        let pair = svc.login("driver1", "password123").await.unwrap();
        assert_eq!(pair.token_type, "bearer");
        assert_ne!(pair.access_token, pair.refresh_token);
        assert_eq!(store.session_count(), 1);

        let claims = svc.verify_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "driver1");
        assert_eq!(store.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_username_checked_before_email() {
        let store = MemoryAuthStore::new();
        let svc = registered(&store, "driver1").await;

        // both clash; username wins
        let err = svc
            .register(register_req("driver1", "driver1@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername));

        let err = svc
            .register(register_req("driver2", "driver1@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));

        assert_eq!(store.user_count(), 1);
        assert_eq!(store.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_registration_race_reports_duplicate() {
        let store = MemoryAuthStore::new();
        let svc = registered(&store, "driver1").await;

        // pre-insert lookups miss, the insert itself must catch the clash
        store.set_stale_reads(true);
        let err = svc
            .register(register_req("driver1", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername));

        let err = svc
            .register(register_req("driver2", "driver1@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let store = MemoryAuthStore::new();
        let svc = service(&store);

        let err = svc
            .register(register_req("driver1", "not-an-email"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let store = MemoryAuthStore::new();
        let svc = registered(&store, "driver1").await;

        let wrong = svc.login("driver1", "nope").await.unwrap_err();
        let unknown = svc.login("ghost", "password123").await.unwrap_err();

        assert!(matches!(wrong, AuthError::Authentication));
        assert!(matches!(unknown, AuthError::Authentication));
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert_eq!(store.session_count(), 0);
        assert_eq!(store.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_refresh_returns_new_access_token() {
        let store = MemoryAuthStore::new();
        let svc = registered(&store, "driver1").await;
        let pair = svc.login("driver1", "password123").await.unwrap();

        let refreshed = svc.refresh(&pair.refresh_token).await.unwrap();
        let claims = svc.verify_access_token(&refreshed.access_token).unwrap();
        assert_eq!(claims.sub, "driver1");
        assert_eq!(claims.token_use, TokenUse::Access);
        // not rotated
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_logout_then_refresh_is_not_found() {
        let store = MemoryAuthStore::new();
        let svc = registered(&store, "driver1").await;
        let pair = svc.login("driver1", "password123").await.unwrap();

        svc.logout(&pair.refresh_token).await.unwrap();

        let err = svc.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenNotFound));
        let err = svc.logout(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenNotFound));
        assert_eq!(store.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = MemoryAuthStore::new();
        let svc = registered(&store, "driver1").await;
        let phone = svc.login("driver1", "password123").await.unwrap();
        let laptop = svc.login("driver1", "password123").await.unwrap();
        assert_ne!(phone.refresh_token, laptop.refresh_token);
        assert_eq!(store.session_count(), 2);

        svc.logout(&phone.refresh_token).await.unwrap();

        assert!(svc.refresh(&laptop.refresh_token).await.is_ok());
        assert!(matches!(
            svc.refresh(&phone.refresh_token).await,
            Err(AuthError::TokenNotFound)
        ));
    }

    #[tokio::test]
    async fn test_strict_refresh_drops_expired_session() {
        let store = MemoryAuthStore::new();
        let policy = AuthPolicy {
            refresh_ttl: Duration::seconds(-5),
            ..AuthPolicy::default()
        };
        let svc = service_with(&store, policy);
        svc.register(register_req("driver1", "driver1@example.com"))
            .await
            .unwrap();
        let pair = svc.login("driver1", "password123").await.unwrap();

        let err = svc.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn test_lenient_refresh_accepts_expired_session() {
        let store = MemoryAuthStore::new();
        let policy = AuthPolicy {
            refresh_ttl: Duration::seconds(-5),
            verify_refresh_tokens: false,
            ..AuthPolicy::default()
        };
        let svc = service_with(&store, policy);
        svc.register(register_req("driver1", "driver1@example.com"))
            .await
            .unwrap();
        let pair = svc.login("driver1", "password123").await.unwrap();

        assert!(svc.refresh(&pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let store = MemoryAuthStore::new();
        let svc = registered(&store, "driver1").await;
        let pair = svc.login("driver1", "password123").await.unwrap();

        assert!(matches!(
            svc.verify_access_token(&pair.refresh_token),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_session_cap_evicts_oldest() {
        let store = MemoryAuthStore::new();
        let policy = AuthPolicy {
            max_sessions_per_user: Some(2),
            ..AuthPolicy::default()
        };
        let svc = service_with(&store, policy);
        svc.register(register_req("driver1", "driver1@example.com"))
            .await
            .unwrap();

        let first = svc.login("driver1", "password123").await.unwrap();
        let second = svc.login("driver1", "password123").await.unwrap();
        let third = svc.login("driver1", "password123").await.unwrap();

        assert_eq!(store.session_count(), 2);
        assert!(matches!(
            svc.refresh(&first.refresh_token).await,
            Err(AuthError::TokenNotFound)
        ));
        assert!(svc.refresh(&second.refresh_token).await.is_ok());
        assert!(svc.refresh(&third.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_session_cap_keeps_new_session() {
        let store = MemoryAuthStore::new();
        let policy = AuthPolicy {
            max_sessions_per_user: Some(0),
            ..AuthPolicy::default()
        };
        let svc = service_with(&store, policy);
        svc.register(register_req("driver1", "driver1@example.com"))
            .await
            .unwrap();

        svc.login("driver1", "password123").await.unwrap();
        let latest = svc.login("driver1", "password123").await.unwrap();

        assert_eq!(store.session_count(), 1);
        assert!(svc.refresh(&latest.refresh_token).await.is_ok());
    }

    #[test]
    fn test_zero_session_cap_rejected_in_config() {
        let config = AuthConfig {
            max_sessions_per_user: Some(0),
            ..AuthConfig::default()
        };
        let result = AuthService::from_config(Arc::new(MemoryAuthStore::new()), &config, SECRET);
        assert!(matches!(result, Err(ConfigError::SessionCap)));

        let config = AuthConfig {
            max_sessions_per_user: Some(1),
            ..AuthConfig::default()
        };
        let svc = AuthService::from_config(Arc::new(MemoryAuthStore::new()), &config, SECRET)
            .unwrap();
        assert_eq!(svc.policy().max_sessions_per_user, Some(1));
    }

    #[tokio::test]
    async fn test_purge_expired_sessions() {
        let store = MemoryAuthStore::new();
        let expired = service_with(
            &store,
            AuthPolicy {
                refresh_ttl: Duration::seconds(-5),
                ..AuthPolicy::default()
            },
        );
        expired
            .register(register_req("driver1", "driver1@example.com"))
            .await
            .unwrap();
        expired.login("driver1", "password123").await.unwrap();
        let live = service(&store);
        live.login("driver1", "password123").await.unwrap();

        assert_eq!(live.purge_expired_sessions().await.unwrap(), 1);
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_current_user() {
        let store = MemoryAuthStore::new();
        let svc = registered(&store, "driver1").await;
        let pair = svc.login("driver1", "password123").await.unwrap();
        let claims = svc.verify_access_token(&pair.access_token).unwrap();

        let profile = svc.current_user(&claims).await.unwrap();
        assert_eq!(profile.username, "driver1");
        assert_eq!(profile.email, "driver1@example.com");
    }

    #[tokio::test]
    async fn test_store_outage_is_storage_error() {
        let store = MemoryAuthStore::new();
        let svc = registered(&store, "driver1").await;
        store.set_unavailable(true);

        let err = svc.login("driver1", "password123").await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
        assert_eq!(store.open_handles(), 0);
    }
}
