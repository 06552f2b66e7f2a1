use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::ids::{self, RecordId};

/// Placeholder silhouette used until a user uploads a photo.
pub const DEFAULT_PROFILE_IMAGE: &str = "data:image/svg+xml;utf8,<svg width=\"100\" height=\"100\" viewBox=\"0 0 100 100\" fill=\"none\" xmlns=\"http://www.w3.org/2000/svg\"><rect width=\"100\" height=\"100\" fill=\"%23E0E0E0\"/><circle cx=\"50\" cy=\"35\" r=\"15\" fill=\"%23999999\"/><path d=\"M20 75C15 75 10 80 10 85V95C10 97 12 100 15 100H85C87 95 90 95 90 95V85C90 80 85 75 80 75H20Z\" fill=\"%23999999\"/></svg>";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "client", alias = "cliente")]
    Client,
    #[serde(rename = "provider", alias = "profissional")]
    Provider,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Provider => "provider",
        }
    }
}

/// Stored user record, credential included.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(deserialize_with = "ids::loose")]
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(rename = "user_type")]
    pub role: Role,
    #[serde(default)]
    pub profile_image: String,
    pub created_at: DateTime<Utc>,
}

/// Everything about a user except the credential; what sessions cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    #[serde(deserialize_with = "ids::loose")]
    pub id: RecordId,
    pub name: String,
    pub email: String,
    #[serde(rename = "user_type")]
    pub role: Role,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub profile_image: String,
}

/// Profile fields a user may edit; absent fields are preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl User {
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            phone: self.phone.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            profile_image: usable_image(&self.profile_image)
                .unwrap_or(DEFAULT_PROFILE_IMAGE)
                .to_string(),
        }
    }

    pub fn apply_profile(&mut self, patch: &ProfilePatch) -> Result<(), ModelError> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
            self.name = name.trim().to_string();
        }
        if let Some(v) = &patch.phone { self.phone = v.clone(); }
        if let Some(v) = &patch.address { self.address = v.clone(); }
        if let Some(v) = &patch.city { self.city = v.clone(); }
        if let Some(v) = &patch.state { self.state = v.clone(); }
        Ok(())
    }
}

impl PublicUser {
    /// Mirror of [`User::apply_profile`] for the session's cached copy.
    pub fn apply_profile(&mut self, patch: &ProfilePatch) {
        if let Some(name) = &patch.name { self.name = name.trim().to_string(); }
        if let Some(v) = &patch.phone { self.phone = v.clone(); }
        if let Some(v) = &patch.address { self.address = v.clone(); }
        if let Some(v) = &patch.city { self.city = v.clone(); }
        if let Some(v) = &patch.state { self.state = v.clone(); }
    }

    /// "City, ST" as used for a provider's default service location.
    pub fn location_label(&self) -> String {
        match (self.city.trim(), self.state.trim()) {
            (city, "") => city.to_string(),
            (city, state) => format!("{city}, {state}").trim().to_string(),
        }
    }
}

/// A stored image reference is usable when non-blank and not a leaked
/// `"null"`/`"undefined"` sentinel.
pub fn usable_image(image: &str) -> Option<&str> {
    let trimmed = image.trim();
    match trimmed {
        "" | "null" | "undefined" => None,
        _ => Some(trimmed),
    }
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ModelError::validation("invalid email"));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::validation("name required"));
    }
    Ok(())
}
