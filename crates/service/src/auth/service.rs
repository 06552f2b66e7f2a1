use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use models::ids::{IdGenerator, RecordId};
use models::user::{validate_email, validate_name, User, DEFAULT_PROFILE_IMAGE};

use super::domain::{AuthSession, LoginInput, RegisterInput};
use super::errors::AuthError;
use super::repository::UserRepository;

/// Auth business service independent of storage
pub struct AuthService<R: UserRepository> {
    repo: Arc<R>,
    ids: Arc<IdGenerator>,
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, ids: Arc<IdGenerator>) -> Self { Self { repo, ids } }

    /// Register a new user and issue a session for it. The session is not
    /// adopted here; the caller decides when to log in.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::AuthService, repository::mock::MockUserRepository};
    /// use service::auth::domain::RegisterInput;
    /// use models::{ids::IdGenerator, user::Role};
    /// use std::sync::Arc;
    /// let svc = AuthService::new(Arc::new(MockUserRepository::default()), Arc::new(IdGenerator::new()));
    /// let input = RegisterInput {
    ///     name: "Ana".into(), email: "ana@example.com".into(), password: "123456".into(),
    ///     phone: String::new(), address: String::new(), city: String::new(), state: String::new(),
    ///     role: Role::Client,
    /// };
    /// let session = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(session.user.email, "ana@example.com");
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthSession, AuthError> {
        validate_name(&input.name)?;
        validate_email(&input.email)?;
        if input.password.is_empty() {
            return Err(AuthError::Validation("password required".into()));
        }
        let email = input.email.trim().to_string();
        if let Some(existing) = self.repo.find_by_email(&email).await? {
            debug!("user exists: {}", existing.email);
            return Err(AuthError::Conflict);
        }

        let user = User {
            id: self.ids.next_id(),
            name: input.name.trim().to_string(),
            email,
            password: input.password,
            phone: input.phone,
            address: input.address,
            city: input.city,
            state: input.state,
            role: input.role,
            profile_image: DEFAULT_PROFILE_IMAGE.to_string(),
            created_at: Utc::now(),
        };
        let user = self.repo.create_user(user).await?;
        info!(user_id = user.id, role = user.role.as_str(), "user_registered");
        Ok(issue(&user))
    }

    /// Authenticate by exact email and password match.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::AuthService, repository::mock::MockUserRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use models::{ids::IdGenerator, user::Role};
    /// use std::sync::Arc;
    /// let svc = AuthService::new(Arc::new(MockUserRepository::default()), Arc::new(IdGenerator::new()));
    /// let _ = tokio_test::block_on(svc.register(RegisterInput {
    ///     name: "N".into(), email: "u@e.com".into(), password: "pw".into(),
    ///     phone: String::new(), address: String::new(), city: String::new(), state: String::new(),
    ///     role: Role::Provider,
    /// }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "pw".into() })).unwrap();
    /// assert!(!session.token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let user = self
            .repo
            .find_by_email(&input.email)
            .await?
            .filter(|u| u.password == input.password)
            .ok_or(AuthError::Unauthorized)?;
        info!(user_id = user.id, "user_logged_in");
        Ok(issue(&user))
    }

    /// Replace the password of `user_id` after checking the current one.
    #[instrument(skip(self, current, new_password))]
    pub async fn change_password(&self, user_id: RecordId, current: &str, new_password: &str) -> Result<(), AuthError> {
        let mut user = self.repo.find_by_id(user_id).await?.ok_or(AuthError::NotFound)?;
        if user.password != current {
            return Err(AuthError::Unauthorized);
        }
        if new_password.is_empty() {
            return Err(AuthError::Validation("password required".into()));
        }
        user.password = new_password.to_string();
        self.repo.replace_user(user).await?;
        info!(user_id, "password_changed");
        Ok(())
    }
}

fn issue(user: &User) -> AuthSession {
    AuthSession { token: format!("token_{}", Uuid::new_v4().simple()), user: user.public() }
}
