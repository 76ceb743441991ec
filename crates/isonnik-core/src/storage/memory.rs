//! In-process `KvStore`, used by tests and by the CLI's `--ephemeral` mode.

use std::collections::HashMap;

use isonnik_types::error::RepositoryError;
use tokio::sync::RwLock;

use super::KvStore;

#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, bypassing any serialization.
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries
            .get_mut()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Snapshot of the raw value under `key`.
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }
}

impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
