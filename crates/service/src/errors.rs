use thiserror::Error;

use models::appointment::AppointmentStatus;
use models::errors::ModelError;

use crate::auth::errors::AuthError;

/// Every failure a domain operation can surface. Nothing is retried.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("not authorized")]
    NotAuthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: AppointmentStatus, to: AppointmentStatus },
    #[error("storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Validation(msg) => ServiceError::Validation(msg),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => ServiceError::Validation(msg),
            AuthError::Conflict => ServiceError::DuplicateEmail,
            AuthError::NotFound => ServiceError::not_found("user"),
            AuthError::Unauthorized => ServiceError::InvalidCredentials,
            AuthError::Repository(msg) => ServiceError::Storage(msg),
        }
    }
}
