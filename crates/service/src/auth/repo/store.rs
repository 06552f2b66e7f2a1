use models::ids::RecordId;
use models::user::User;

use crate::auth::errors::AuthError;
use crate::auth::repository::UserRepository;
use crate::storage::{Collection, RecordStore};

/// `users` collection of a [`RecordStore`], read and rewritten whole.
#[derive(Clone)]
pub struct StoreUserRepository {
    pub store: RecordStore,
}

impl StoreUserRepository {
    async fn all(&self) -> Vec<User> {
        self.store.load(Collection::Users).await
    }

    async fn save_all(&self, users: &[User]) -> Result<(), AuthError> {
        self.store
            .save(Collection::Users, users)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))
    }
}

#[async_trait::async_trait]
impl UserRepository for StoreUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.all().await.into_iter().find(|u| u.email == email))
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<User>, AuthError> {
        Ok(self.all().await.into_iter().find(|u| u.id == id))
    }

    async fn create_user(&self, user: User) -> Result<User, AuthError> {
        let mut users = self.all().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(AuthError::Conflict);
        }
        users.push(user.clone());
        self.save_all(&users).await?;
        Ok(user)
    }

    async fn replace_user(&self, user: User) -> Result<(), AuthError> {
        let mut users = self.all().await;
        let slot = users.iter_mut().find(|u| u.id == user.id).ok_or(AuthError::NotFound)?;
        *slot = user;
        self.save_all(&users).await
    }
}
