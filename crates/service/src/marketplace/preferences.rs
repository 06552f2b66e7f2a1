use super::Marketplace;
use crate::errors::ServiceError;

/// Dark-mode flag, stored apart from the session so it survives logout.
pub const DARK_MODE_KEY: &str = "dark";

impl Marketplace {
    pub async fn dark_mode(&self) -> bool {
        self.store.get_raw(DARK_MODE_KEY).await.as_deref() == Some("1")
    }

    pub async fn set_dark_mode(&self, enabled: bool) -> Result<(), ServiceError> {
        self.store.set_raw(DARK_MODE_KEY, if enabled { "1" } else { "0" }.to_string()).await
    }
}
