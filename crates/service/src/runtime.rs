//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` so the binary can prepare the data
//! directory through `service::runtime` without depending on `common` for it.

use configs::AppConfig;

/// Ensure the configured data directory exists.
pub async fn ensure_env(cfg: &AppConfig) -> anyhow::Result<()> {
    common::env::ensure_env(&cfg.storage.data_dir).await
}
