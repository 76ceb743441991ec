//! File-backed `KvStore`: one file per key under the profile directory.
//!
//! Writes go to a uniquely named temp file in the same directory and are
//! renamed over the target, so a crash mid-write leaves either the old or
//! the new value, never a torn one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use isonnik_core::storage::KvStore;
use isonnik_types::error::RepositoryError;
use uuid::Uuid;

use super::validate_name;

pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    /// The directory is created lazily on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, RepositoryError> {
        validate_name(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            // Undecodable bytes are corrupt data, not an IO failure: let the
            // snapshot layer heal them.
            Err(err) if err.kind() == ErrorKind::InvalidData => {
                tracing::warn!(key, "Stored value is not valid UTF-8");
                Ok(Some(String::new()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let tmp = self.dir.join(format!(".{key}.{}.tmp", Uuid::now_v7()));
        tokio::fs::write(&tmp, value).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isonnik_core::storage::keys;
    use isonnik_core::storage::snapshot::SnapshotStore;
    use isonnik_types::chat::Session;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_set_get_delete() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::new(dir.path().join("profiles").join("default"));

        assert!(store.get(keys::SESSION).await.unwrap().is_none());

        store.set(keys::SESSION, r#"{"messages":[]}"#).await.unwrap();
        assert_eq!(
            store.get(keys::SESSION).await.unwrap().as_deref(),
            Some(r#"{"messages":[]}"#)
        );
        assert!(store.dir().join("session.json").exists());

        store.delete(keys::SESSION).await.unwrap();
        assert!(store.get(keys::SESSION).await.unwrap().is_none());
        store.delete(keys::SESSION).await.unwrap();
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::new(dir.path());
        store.set(keys::QUOTA, "1").await.unwrap();
        store.set(keys::QUOTA, "2").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["quota.json"]);
        assert_eq!(store.get(keys::QUOTA).await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::new(dir.path());
        assert!(store.set("../escape", "x").await.is_err());
        assert!(store.get("a/b").await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_file_self_heals_through_snapshot_store() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("session.json"), [0xff, 0xfe, 0x00]).unwrap();
        let store = Arc::new(FileKvStore::new(dir.path()));
        let sessions = SnapshotStore::new(Arc::clone(&store), keys::SESSION, Session::welcome("hi"));

        assert_eq!(sessions.load().await.unwrap(), Session::welcome("hi"));
        let healed = std::fs::read_to_string(dir.path().join("session.json")).unwrap();
        assert_eq!(serde_json::from_str::<Session>(&healed).unwrap(), Session::welcome("hi"));
    }
}
