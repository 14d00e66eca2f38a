use std::sync::Arc;

use crate::db::Database;
use crate::user_auth::AuthService;
use crate::users::UserAdmin;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Register / login / refresh / logout
    pub auth: Arc<AuthService>,
    /// `/user` administration over the same store as `auth`
    pub users: Arc<UserAdmin>,
    /// PostgreSQL (content routes). `None` in memory mode.
    pub db: Option<Database>,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>, db: Option<Database>) -> Self {
        let users = Arc::new(UserAdmin::new(Arc::clone(auth.store())));
        Self { auth, users, db }
    }

    /// True when the content routes are served
    pub fn has_catalog(&self) -> bool {
        self.db.is_some()
    }
}
