use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use models::ids::RecordId;

use crate::errors::ServiceError;
use crate::storage::kv::KvBackend;

/// The named record collections persisted by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Services,
    Appointments,
    Messages,
    Reviews,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Services,
        Collection::Appointments,
        Collection::Messages,
        Collection::Reviews,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Services => "services",
            Collection::Appointments => "appointments",
            Collection::Messages => "messages",
            Collection::Reviews => "reviews",
        }
    }
}

/// Whole-collection load/save over a text key-value medium.
///
/// There is no per-record update: callers read the full collection, modify it,
/// and save it back. Absent or unparsable collections load as empty; a row that
/// does not decode as `T` is skipped on its own.
#[derive(Clone)]
pub struct RecordStore {
    kv: Arc<dyn KvBackend>,
    prefix: String,
}

impl RecordStore {
    pub fn new(kv: Arc<dyn KvBackend>, prefix: impl Into<String>) -> Self {
        Self { kv, prefix: prefix.into() }
    }

    /// Full medium key for a logical name, e.g. `servlink_users`.
    pub fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    pub async fn load<T: DeserializeOwned>(&self, collection: Collection) -> Vec<T> {
        let key = self.key(collection.name());
        let Some(raw) = self.kv.get(&key).await else {
            return Vec::new();
        };
        let rows = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(%key, error = %e, "undecodable collection; treating as empty");
                return Vec::new();
            }
        };
        rows.into_iter()
            .enumerate()
            .filter_map(|(index, row)| {
                serde_json::from_value::<T>(row)
                    .map_err(|e| warn!(%key, index, error = %e, "undecodable record; skipping"))
                    .ok()
            })
            .collect()
    }

    pub async fn save<T: Serialize>(&self, collection: Collection, records: &[T]) -> Result<(), ServiceError> {
        let key = self.key(collection.name());
        let encoded = serde_json::to_string(records).map_err(|e| ServiceError::Storage(e.to_string()))?;
        self.kv.set(&key, encoded).await?;
        debug!(%key, count = records.len(), "collection saved");
        Ok(())
    }

    pub async fn get_raw(&self, name: &str) -> Option<String> {
        self.kv.get(&self.key(name)).await
    }

    pub async fn set_raw(&self, name: &str, value: String) -> Result<(), ServiceError> {
        self.kv.set(&self.key(name), value).await
    }

    /// Decode a single JSON value; undecodable values read as absent.
    pub async fn get_value<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let raw = self.get_raw(name).await?;
        serde_json::from_str(&raw)
            .map_err(|e| warn!(key = %self.key(name), error = %e, "undecodable value; ignoring"))
            .ok()
    }

    pub async fn set_value<T: Serialize>(&self, name: &str, value: &T) -> Result<(), ServiceError> {
        let encoded = serde_json::to_string(value).map_err(|e| ServiceError::Storage(e.to_string()))?;
        self.set_raw(name, encoded).await
    }

    pub async fn remove(&self, name: &str) -> Result<bool, ServiceError> {
        self.kv.remove(&self.key(name)).await
    }

    /// Largest id persisted in any collection, or 0.
    pub async fn max_id(&self) -> RecordId {
        let mut max = 0;
        for collection in Collection::ALL {
            let rows: Vec<serde_json::Value> = self.load(collection).await;
            for row in rows {
                let id = row.get("id").and_then(|v| {
                    v.as_i64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
                });
                if let Some(id) = id {
                    max = max.max(id);
                }
            }
        }
        max
    }
}
