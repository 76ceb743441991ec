//! Whole-snapshot persistence with self-healing loads.
//!
//! One serialized blob lives under one fixed key. `load` never surfaces a
//! missing, unparseable or structurally invalid blob: it writes the default
//! back and returns it, so the corrupt state is not read again. Only real
//! storage failures (IO, database) propagate.

use std::sync::Arc;

use isonnik_types::chat::{ChatCollection, Session};
use isonnik_types::error::RepositoryError;
use isonnik_types::quota::QuotaState;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::KvStore;

/// A value persisted as a single blob.
pub trait Snapshot: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Structural check after parsing. `None` rejects the blob.
    fn repair(self) -> Option<Self> {
        Some(self)
    }
}

impl Snapshot for Session {}

impl Snapshot for QuotaState {
    fn repair(self) -> Option<Self> {
        Some(self.normalized())
    }
}

impl Snapshot for ChatCollection {
    fn repair(self) -> Option<Self> {
        let mut seen = std::collections::HashSet::new();
        if self.chats.iter().all(|c| seen.insert(c.id)) {
            Some(self)
        } else {
            None
        }
    }
}

/// Load/save/clear for one snapshot type under one key.
pub struct SnapshotStore<S, T> {
    store: Arc<S>,
    key: &'static str,
    default: T,
}

impl<S, T: Clone> Clone for SnapshotStore<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            default: self.default.clone(),
        }
    }
}

impl<S: KvStore, T: Snapshot> SnapshotStore<S, T> {
    pub fn new(store: Arc<S>, key: &'static str, default: T) -> Self {
        Self {
            store,
            key,
            default,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// The value a fresh or healed store starts with.
    pub fn default_value(&self) -> T {
        self.default.clone()
    }

    /// Load the snapshot, re-initializing it when absent or corrupt.
    ///
    /// Idempotent: two loads in a row return the same value.
    pub async fn load(&self) -> Result<T, RepositoryError> {
        let Some(raw) = self.store.get(self.key).await? else {
            debug!(key = self.key, "No stored snapshot, initializing default");
            return self.reset().await;
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => match value.repair() {
                Some(value) => Ok(value),
                None => {
                    warn!(key = self.key, "Stored snapshot is structurally invalid, re-initializing");
                    self.reset().await
                }
            },
            Err(err) => {
                warn!(key = self.key, error = %err, "Stored snapshot is unreadable, re-initializing");
                self.reset().await
            }
        }
    }

    /// Replace the stored snapshot.
    pub async fn save(&self, value: &T) -> Result<(), RepositoryError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        self.store.set(self.key, &raw).await
    }

    /// Remove the stored snapshot entirely.
    pub async fn clear(&self) -> Result<(), RepositoryError> {
        self.store.delete(self.key).await
    }

    async fn reset(&self) -> Result<T, RepositoryError> {
        let value = self.default.clone();
        self.save(&value).await?;
        Ok(value)
    }
}
