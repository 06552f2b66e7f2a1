//! Domain operations of the marketplace.
//!
//! [`Marketplace`] owns the record store, the session, the rating aggregator
//! and the id generator. Each submodule adds one family of operations as an
//! `impl Marketplace` block. Every operation awaits the configured latency
//! before it touches storage, then reads and rewrites whole collections.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use configs::{AppConfig, RuntimeConfig};
use models::ids::IdGenerator;

use crate::auth::repo::StoreUserRepository;
use crate::auth::AuthService;
use crate::errors::ServiceError;
use crate::notifications::NotificationPoller;
use crate::ratings::RatingAggregator;
use crate::session::SessionState;
use crate::storage::{JsonMapStore, KvBackend, RecordStore};

pub mod account;
pub mod appointments;
pub mod listings;
pub mod messages;
pub mod preferences;
pub mod reviews;
pub mod stats;

pub use listings::{SearchFilters, SortBy};

/// Runtime knobs taken from `[runtime]`.
#[derive(Debug, Clone, Copy)]
pub struct MarketplaceSettings {
    pub latency: Duration,
    pub poll_interval: Duration,
    pub enforce_transitions: bool,
}

impl Default for MarketplaceSettings {
    fn default() -> Self { Self::from(&RuntimeConfig::default()) }
}

impl From<&RuntimeConfig> for MarketplaceSettings {
    fn from(cfg: &RuntimeConfig) -> Self {
        Self {
            latency: Duration::from_millis(cfg.latency_ms),
            poll_interval: Duration::from_secs(cfg.poll_interval_secs.max(1)),
            enforce_transitions: cfg.enforce_transitions,
        }
    }
}

pub struct Marketplace {
    store: RecordStore,
    auth: AuthService<StoreUserRepository>,
    session: SessionState,
    ratings: RatingAggregator,
    ids: Arc<IdGenerator>,
    settings: MarketplaceSettings,
    poller: Mutex<Option<NotificationPoller>>,
}

impl Marketplace {
    /// Build over any medium, restoring a persisted session. New ids are
    /// allocated above every id already stored.
    pub async fn new(kv: Arc<dyn KvBackend>, prefix: &str, settings: MarketplaceSettings) -> Arc<Self> {
        let store = RecordStore::new(kv, prefix);
        let ids = Arc::new(IdGenerator::starting_after(store.max_id().await));
        let auth = AuthService::new(Arc::new(StoreUserRepository { store: store.clone() }), ids.clone());
        let session = SessionState::restore(store.clone()).await;
        Arc::new(Self {
            ratings: RatingAggregator::new(store.clone()),
            store,
            auth,
            session,
            ids,
            settings,
            poller: Mutex::new(None),
        })
    }

    /// Open the file-backed medium described by `cfg`.
    pub async fn open(cfg: &AppConfig) -> Result<Arc<Self>, ServiceError> {
        let path = cfg.storage_path();
        let kv = JsonMapStore::<String, String>::new(&path).await?;
        info!(path = %path.display(), prefix = %cfg.storage.key_prefix, "marketplace store opened");
        Ok(Self::new(kv, &cfg.storage.key_prefix, MarketplaceSettings::from(&cfg.runtime)).await)
    }

    pub fn store(&self) -> &RecordStore { &self.store }

    pub fn session(&self) -> &SessionState { &self.session }

    pub fn settings(&self) -> &MarketplaceSettings { &self.settings }

    pub(crate) fn ratings(&self) -> &RatingAggregator { &self.ratings }

    pub(crate) fn next_id(&self) -> models::ids::RecordId { self.ids.next_id() }

    async fn simulate_latency(&self) {
        if !self.settings.latency.is_zero() {
            tokio::time::sleep(self.settings.latency).await;
        }
    }

    /// Start the pending-appointment poller if it is not running; returns a
    /// receiver of the latest pending count.
    pub async fn start_notifications(self: &Arc<Self>) -> watch::Receiver<usize> {
        let mut slot = self.poller.lock().await;
        if let Some(poller) = slot.as_ref() {
            return poller.subscribe();
        }
        let poller = NotificationPoller::start(Arc::downgrade(self), self.settings.poll_interval);
        let rx = poller.subscribe();
        *slot = Some(poller);
        debug!(interval_secs = self.settings.poll_interval.as_secs(), "notifications started");
        rx
    }

    /// Stop the poller and wait for its task. No-op when not running.
    pub async fn stop_notifications(&self) {
        let poller = self.poller.lock().await.take();
        if let Some(poller) = poller {
            poller.stop().await;
            debug!("notifications stopped");
        }
    }

    pub async fn notifications_running(&self) -> bool {
        self.poller.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::domain::LoginInput;
    use crate::storage::{Collection, MemoryKv};
    use crate::test_support::{register_input, sample_draft, settings, PASSWORD};
    use models::listing::Service;
    use models::user::Role;

    fn file_config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.storage.data_dir = std::env::temp_dir()
            .join(format!("servlink_market_{}", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned();
        cfg.runtime.latency_ms = 0;
        cfg.runtime.poll_interval_secs = 3600;
        cfg
    }

    #[tokio::test]
    async fn file_store_survives_reopen_with_session() -> Result<(), anyhow::Error> {
        let cfg = file_config();
        let created = {
            let m = Marketplace::open(&cfg).await?;
            m.register(register_input("carlos@example.com", Role::Provider)).await?;
            m.login(LoginInput { email: "carlos@example.com".into(), password: PASSWORD.into() }).await?;
            let created = m.create_service(sample_draft("Pintura")).await?;
            m.stop_notifications().await;
            created
        };

        let reopened = Marketplace::open(&cfg).await?;
        assert_eq!(reopened.current_user().await.map(|u| u.email), Some("carlos@example.com".to_string()));
        let found = reopened.get_service(created.id).await?;
        assert_eq!(found.title, "Pintura");

        let raw = tokio::fs::read_to_string(cfg.storage_path()).await?;
        assert!(raw.contains("servlink_services"));
        tokio::fs::remove_dir_all(&cfg.storage.data_dir).await.ok();
        Ok(())
    }

    #[tokio::test]
    async fn new_ids_are_above_stored_ones() -> Result<(), anyhow::Error> {
        let kv = Arc::new(MemoryKv::new());
        let far_future = 9_000_000_000_000_i64;
        kv.set(
            "servlink_services",
            serde_json::to_string(&[serde_json::json!({"id": far_future.to_string()})])?,
        )
        .await?;
        let m = Marketplace::new(kv, "servlink_", settings()).await;
        let issued = m.register(register_input("ana@example.com", Role::Client)).await?;
        assert!(issued.user.id > far_future);
        let undecodable: Vec<Service> = m.store().load(Collection::Services).await;
        assert!(undecodable.is_empty());
        Ok(())
    }

    #[test]
    fn settings_follow_runtime_config() {
        let cfg = RuntimeConfig { latency_ms: 0, poll_interval_secs: 5, enforce_transitions: true };
        let s = MarketplaceSettings::from(&cfg);
        assert!(s.latency.is_zero());
        assert_eq!(s.poll_interval, Duration::from_secs(5));
        assert!(s.enforce_transitions);
        assert_eq!(MarketplaceSettings::default().latency, Duration::from_millis(300));
    }
}
