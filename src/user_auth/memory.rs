//! In-process auth store.
//!
//! Used when no PostgreSQL URL is configured and by tests. Uniqueness and
//! cascade rules match the SQL schema. Handles are counted so callers can
//! check that every acquired handle was released.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::models::{NewRefreshToken, NewUser, RefreshTokenRecord, UserIdentity};
use super::store::{
    AuthStore, SessionStore, StoreError, StoreHandle, UniqueField, UserDirectory,
};

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<i64, UserIdentity>,
    sessions: BTreeMap<i64, RefreshTokenRecord>,
    next_user_id: i64,
    next_session_id: i64,
    /// Lookups by username/email miss, as if a concurrent request had not
    /// committed yet.
    #[cfg(test)]
    stale_reads: bool,
}

impl MemoryState {
    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn hide_lookups(&self) -> bool {
        #[cfg(test)]
        {
            self.stale_reads
        }
        #[cfg(not(test))]
        {
            false
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryAuthStore {
    state: Arc<Mutex<MemoryState>>,
    open_handles: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles acquired and not yet dropped
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    pub fn user_count(&self) -> usize {
        lock(&self.state).users.len()
    }

    pub fn session_count(&self) -> usize {
        lock(&self.state).sessions.len()
    }

    /// Make `acquire` and `ping` fail, as a lost database would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub(crate) fn set_stale_reads(&self, stale: bool) {
        lock(&self.state).stale_reads = stale;
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl AuthStore for MemoryAuthStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn acquire(&self) -> Result<Box<dyn StoreHandle>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryStoreHandle {
            state: Arc::clone(&self.state),
            open_handles: Arc::clone(&self.open_handles),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

pub struct MemoryStoreHandle {
    state: Arc<Mutex<MemoryState>>,
    open_handles: Arc<AtomicUsize>,
}

impl Drop for MemoryStoreHandle {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserDirectory for MemoryStoreHandle {
    async fn find_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<UserIdentity>, StoreError> {
        let state = lock(&self.state);
        if state.hide_lookups() {
            return Ok(None);
        }
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&mut self, email: &str) -> Result<Option<UserIdentity>, StoreError> {
        let state = lock(&self.state);
        if state.hide_lookups() {
            return Ok(None);
        }
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&mut self, id: i64) -> Result<Option<UserIdentity>, StoreError> {
        Ok(lock(&self.state).users.get(&id).cloned())
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<UserIdentity, StoreError> {
        let mut state = lock(&self.state);
        // username first, matching the order register checks in
        if state.username_taken(&user.username, None) {
            return Err(StoreError::Duplicate(UniqueField::Username));
        }
        if state.email_taken(&user.email, None) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }
        state.next_user_id += 1;
        let record = UserIdentity {
            id: state.next_user_id,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        state.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_users(&mut self) -> Result<Vec<UserIdentity>, StoreError> {
        Ok(lock(&self.state).users.values().cloned().collect())
    }

    async fn update_user(
        &mut self,
        id: i64,
        email: &str,
        username: &str,
    ) -> Result<Option<UserIdentity>, StoreError> {
        let mut state = lock(&self.state);
        if !state.users.contains_key(&id) {
            return Ok(None);
        }
        if state.username_taken(username, Some(id)) {
            return Err(StoreError::Duplicate(UniqueField::Username));
        }
        if state.email_taken(email, Some(id)) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }
        let user = state.users.get_mut(&id).map(|u| {
            u.email = email.to_string();
            u.username = username.to_string();
            u.clone()
        });
        Ok(user)
    }

    async fn delete_user(&mut self, id: i64) -> Result<bool, StoreError> {
        let mut state = lock(&self.state);
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state.sessions.retain(|_, s| s.user_id != id);
        Ok(true)
    }
}

#[async_trait]
impl SessionStore for MemoryStoreHandle {
    async fn insert_session(
        &mut self,
        record: NewRefreshToken,
    ) -> Result<RefreshTokenRecord, StoreError> {
        let mut state = lock(&self.state);
        if !state.users.contains_key(&record.user_id) {
            return Err(StoreError::MissingReference(format!(
                "user {}",
                record.user_id
            )));
        }
        if state.sessions.values().any(|s| s.token == record.token) {
            return Err(StoreError::Duplicate(UniqueField::Token));
        }
        state.next_session_id += 1;
        let stored = RefreshTokenRecord {
            id: state.next_session_id,
            token: record.token,
            user_id: record.user_id,
            created_at: Utc::now(),
            expires_at: record.expires_at,
        };
        state.sessions.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_token(
        &mut self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(lock(&self.state)
            .sessions
            .values()
            .find(|s| s.token == token)
            .cloned())
    }

    async fn delete_session(&mut self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        lock(&self.state).sessions.remove(&record.id);
        Ok(())
    }

    async fn list_for_user(&mut self, user_id: i64) -> Result<Vec<RefreshTokenRecord>, StoreError> {
        // ids grow with insertion, so map order is creation order
        Ok(lock(&self.state)
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_expired(&mut self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = lock(&self.state);
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.expires_at >= now);
        Ok((before - state.sessions.len()) as u64)
    }
}
