use async_trait::async_trait;

use models::ids::RecordId;
use models::user::User;

use super::errors::AuthError;

/// Repository abstraction for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;
    async fn find_by_id(&self, id: RecordId) -> Result<Option<User>, AuthError>;
    /// Insert a new user; `Conflict` if the email is taken.
    async fn create_user(&self, user: User) -> Result<User, AuthError>;
    /// Replace an existing user by id; `NotFound` if absent.
    async fn replace_user(&self, user: User) -> Result<(), AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockUserRepository {
        users: Mutex<HashMap<RecordId, User>>, // key: user id
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
            let users = self.users.lock().map_err(|e| AuthError::Repository(e.to_string()))?;
            Ok(users.values().find(|u| u.email == email).cloned())
        }

        async fn find_by_id(&self, id: RecordId) -> Result<Option<User>, AuthError> {
            let users = self.users.lock().map_err(|e| AuthError::Repository(e.to_string()))?;
            Ok(users.get(&id).cloned())
        }

        async fn create_user(&self, user: User) -> Result<User, AuthError> {
            let mut users = self.users.lock().map_err(|e| AuthError::Repository(e.to_string()))?;
            if users.values().any(|u| u.email == user.email) {
                return Err(AuthError::Conflict);
            }
            users.insert(user.id, user.clone());
            Ok(user)
        }

        async fn replace_user(&self, user: User) -> Result<(), AuthError> {
            let mut users = self.users.lock().map_err(|e| AuthError::Repository(e.to_string()))?;
            match users.get_mut(&user.id) {
                Some(slot) => {
                    *slot = user;
                    Ok(())
                }
                None => Err(AuthError::NotFound),
            }
        }
    }
}
