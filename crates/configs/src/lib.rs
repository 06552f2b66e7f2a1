use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Where and how the key-value medium is persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Prefix prepended to every collection and session key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir(), file_name: default_file_name(), key_prefix: default_key_prefix() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Simulated latency awaited by every domain operation.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Reject appointment status changes outside the transition table.
    #[serde(default)]
    pub enforce_transitions: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { latency_ms: default_latency_ms(), poll_interval_secs: default_poll_interval(), enforce_transitions: false }
    }
}

fn default_data_dir() -> String { "data".into() }
fn default_file_name() -> String { "servlink.json".into() }
fn default_key_prefix() -> String { "servlink_".into() }
fn default_latency_ms() -> u64 { 300 }
fn default_poll_interval() -> u64 { 30 }

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `$CONFIG_PATH`), falling back to defaults when the
    /// file is missing, then apply env overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = if std::path::Path::new(&path).exists() {
            load_from_file(&path)?
        } else {
            AppConfig::default()
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.storage.normalize_from_env();
        self.storage.validate()?;
        self.runtime.normalize_from_env();
        self.runtime.validate()?;
        Ok(())
    }

    /// Full path of the JSON file backing the key-value medium.
    pub fn storage_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.storage.data_dir).join(&self.storage.file_name)
    }
}

impl StorageConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(dir) = std::env::var("SERVLINK_DATA_DIR") {
            if !dir.trim().is_empty() {
                self.data_dir = dir;
            }
        }
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.file_name.trim().is_empty() {
            return Err(anyhow!("storage.file_name must not be empty"));
        }
        if self.file_name.contains('/') || self.file_name.contains('\\') {
            return Err(anyhow!("storage.file_name must be a bare file name"));
        }
        Ok(())
    }
}

impl RuntimeConfig {
    pub fn normalize_from_env(&mut self) {
        if let Some(ms) = std::env::var("SERVLINK_LATENCY_MS").ok().and_then(|v| v.parse::<u64>().ok()) {
            self.latency_ms = ms;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(anyhow!("runtime.poll_interval_secs must be >= 1"));
        }
        Ok(())
    }
}
