//! The logged-in identity.
//!
//! A [`SessionState`] is owned by the marketplace rather than living in
//! globals. It is restored from the session keys at startup, adopted on login,
//! and cleared on logout; every change is written through to the medium.

use tokio::sync::RwLock;
use tracing::{debug, info};

use models::user::PublicUser;

use crate::auth::domain::AuthSession;
use crate::errors::ServiceError;
use crate::storage::RecordStore;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

pub struct SessionState {
    store: RecordStore,
    current: RwLock<Option<AuthSession>>,
}

impl SessionState {
    /// Empty session bound to `store`, ignoring anything persisted.
    pub fn new(store: RecordStore) -> Self {
        Self { store, current: RwLock::new(None) }
    }

    /// Pick up a session persisted by an earlier run. Both keys must be present
    /// and decodable, otherwise the session starts empty.
    pub async fn restore(store: RecordStore) -> Self {
        let token = store.get_raw(TOKEN_KEY).await.filter(|t| !t.is_empty());
        let user = store.get_value::<PublicUser>(USER_KEY).await;
        let current = match (token, user) {
            (Some(token), Some(user)) => {
                info!(user_id = user.id, "session restored");
                Some(AuthSession { token, user })
            }
            _ => None,
        };
        Self { store, current: RwLock::new(current) }
    }

    pub async fn adopt(&self, session: AuthSession) -> Result<(), ServiceError> {
        self.store.set_raw(TOKEN_KEY, session.token.clone()).await?;
        self.store.set_value(USER_KEY, &session.user).await?;
        debug!(user_id = session.user.id, "session adopted");
        *self.current.write().await = Some(session);
        Ok(())
    }

    /// Clear the session and its persisted keys; returns what was active.
    pub async fn end(&self) -> Result<Option<AuthSession>, ServiceError> {
        let previous = self.current.write().await.take();
        self.store.remove(TOKEN_KEY).await?;
        self.store.remove(USER_KEY).await?;
        if let Some(s) = &previous {
            info!(user_id = s.user.id, "session ended");
        }
        Ok(previous)
    }

    pub async fn current(&self) -> Option<AuthSession> {
        self.current.read().await.clone()
    }

    pub async fn user(&self) -> Option<PublicUser> {
        self.current.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn is_active(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// The session user, or `NotAuthorized` when nobody is logged in.
    pub async fn require_user(&self) -> Result<PublicUser, ServiceError> {
        self.user().await.ok_or(ServiceError::NotAuthorized)
    }

    /// Mutate the cached user and persist it. No-op without a session.
    pub async fn update_user<F>(&self, f: F) -> Result<Option<PublicUser>, ServiceError>
    where
        F: FnOnce(&mut PublicUser),
    {
        let mut guard = self.current.write().await;
        let Some(session) = guard.as_mut() else {
            return Ok(None);
        };
        f(&mut session.user);
        self.store.set_value(USER_KEY, &session.user).await?;
        Ok(Some(session.user.clone()))
    }
}
