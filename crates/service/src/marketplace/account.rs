use std::sync::Arc;

use tracing::{info, instrument, warn};

use models::ids::RecordId;
use models::listing::Service;
use models::user::{usable_image, ProfilePatch, PublicUser, User, DEFAULT_PROFILE_IMAGE};

use super::Marketplace;
use crate::auth::domain::{AuthSession, LoginInput, RegisterInput};
use crate::errors::ServiceError;
use crate::storage::Collection;

impl Marketplace {
    /// Authenticate, adopt the session and start notifications.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(self: &Arc<Self>, input: LoginInput) -> Result<AuthSession, ServiceError> {
        self.simulate_latency().await;
        let session = self.auth.login(input).await.map_err(|e| {
            warn!(code = e.code(), error = %e, "login_failed");
            e
        })?;
        self.session.adopt(session.clone()).await?;
        self.start_notifications().await;
        Ok(session)
    }

    /// Create an account. The returned session is not adopted; call
    /// [`Marketplace::login`] to act as the new user.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthSession, ServiceError> {
        self.simulate_latency().await;
        Ok(self.auth.register(input).await.map_err(|e| {
            warn!(code = e.code(), error = %e, "register_failed");
            e
        })?)
    }

    /// Stop notifications and clear the persisted session.
    pub async fn logout(&self) -> Result<(), ServiceError> {
        self.stop_notifications().await;
        if let Some(previous) = self.session.end().await? {
            info!(user_id = previous.user.id, "user_logged_out");
        }
        Ok(())
    }

    pub async fn current_user(&self) -> Option<PublicUser> {
        self.session.user().await
    }

    /// Merge `patch` into the stored user and the session's cached copy.
    #[instrument(skip(self, patch))]
    pub async fn update_user_profile(&self, patch: ProfilePatch) -> Result<PublicUser, ServiceError> {
        self.simulate_latency().await;
        let me = self.session.require_user().await?;
        let mut users: Vec<User> = self.store.load(Collection::Users).await;
        let user = users.iter_mut().find(|u| u.id == me.id).ok_or_else(|| ServiceError::not_found("user"))?;
        user.apply_profile(&patch)?;
        let public = user.public();
        self.store.save(Collection::Users, &users).await?;
        self.session.update_user(|u| u.apply_profile(&patch)).await?;
        info!(user_id = me.id, "profile_updated");
        Ok(public)
    }

    /// Replace the session user's photo and copy it onto every service they own.
    #[instrument(skip(self, image))]
    pub async fn update_user_profile_image(&self, image: &str) -> Result<PublicUser, ServiceError> {
        self.simulate_latency().await;
        let me = self.session.require_user().await?;
        let image = usable_image(image)
            .ok_or_else(|| ServiceError::Validation("profile image required".into()))?
            .to_string();

        let mut users: Vec<User> = self.store.load(Collection::Users).await;
        let user = users.iter_mut().find(|u| u.id == me.id).ok_or_else(|| ServiceError::not_found("user"))?;
        user.profile_image = image.clone();
        let public = user.public();
        self.store.save(Collection::Users, &users).await?;

        let mut services: Vec<Service> = self.store.load(Collection::Services).await;
        let mut touched = 0usize;
        for service in services.iter_mut().filter(|s| s.provider_id == me.id) {
            service.profile_image = Some(image.clone());
            touched += 1;
        }
        if touched > 0 {
            self.store.save(Collection::Services, &services).await?;
        }

        self.session.update_user(|u| u.profile_image = image.clone()).await?;
        info!(user_id = me.id, services = touched, "profile_image_updated");
        Ok(public)
    }

    /// Current photo of `user_id`: the session's cached copy when it is that
    /// user, then the stored record, then the placeholder.
    pub async fn user_profile_image(&self, user_id: RecordId) -> String {
        if let Some(me) = self.session.user().await {
            if me.id == user_id {
                if let Some(image) = usable_image(&me.profile_image) {
                    return image.to_string();
                }
            }
        }
        let users: Vec<User> = self.store.load(Collection::Users).await;
        users
            .iter()
            .find(|u| u.id == user_id)
            .and_then(|u| usable_image(&u.profile_image))
            .unwrap_or(DEFAULT_PROFILE_IMAGE)
            .to_string()
    }

    #[instrument(skip(self, current, new_password))]
    pub async fn change_password(&self, current: &str, new_password: &str) -> Result<(), ServiceError> {
        self.simulate_latency().await;
        let me = self.session.require_user().await?;
        Ok(self.auth.change_password(me.id, current, new_password).await?)
    }
}
