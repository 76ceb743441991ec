//! Durable `KvStore` adapters and the per-profile store selector.

pub mod file;
pub mod sqlite;

use std::path::Path;

use isonnik_core::storage::KvStore;
use isonnik_core::storage::memory::MemoryKvStore;
use isonnik_types::config::StorageKind;
use isonnik_types::error::RepositoryError;

pub use file::FileKvStore;
pub use sqlite::SqliteKvStore;

use crate::filesystem::{database_path, profile_dir};

/// Profile names and keys end up in file names, so keep them to a safe set.
pub(crate) fn validate_name(name: &str) -> Result<(), RepositoryError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(RepositoryError::Query(format!("invalid name: '{name}'")))
    }
}

/// The store behind one profile, chosen by configuration.
pub enum ProfileStore {
    File(FileKvStore),
    Sqlite(SqliteKvStore),
    /// Nothing survives the process.
    Memory(MemoryKvStore),
}

impl ProfileStore {
    pub async fn open(
        data_dir: &Path,
        profile: &str,
        kind: StorageKind,
    ) -> Result<Self, RepositoryError> {
        match kind {
            StorageKind::File => {
                validate_name(profile)?;
                Ok(Self::File(FileKvStore::new(profile_dir(data_dir, profile))))
            }
            StorageKind::Sqlite => Ok(Self::Sqlite(
                SqliteKvStore::open(&database_path(data_dir), profile).await?,
            )),
        }
    }

    pub fn ephemeral() -> Self {
        Self::Memory(MemoryKvStore::new())
    }

    pub fn describe(&self) -> String {
        match self {
            Self::File(store) => format!("file ({})", store.dir().display()),
            Self::Sqlite(store) => format!("sqlite (profile {})", store.profile()),
            Self::Memory(_) => "memory".to_string(),
        }
    }
}

impl KvStore for ProfileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        match self {
            Self::File(store) => store.get(key).await,
            Self::Sqlite(store) => store.get(key).await,
            Self::Memory(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        match self {
            Self::File(store) => store.set(key, value).await,
            Self::Sqlite(store) => store.set(key, value).await,
            Self::Memory(store) => store.set(key, value).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        match self {
            Self::File(store) => store.delete(key).await,
            Self::Sqlite(store) => store.delete(key).await,
            Self::Memory(store) => store.delete(key).await,
        }
    }
}
