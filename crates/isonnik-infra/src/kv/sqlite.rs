//! SQLite key-value store implementation.
//!
//! Implements `KvStore` from `isonnik-core` using sqlx. Every profile shares
//! one database file; rows are keyed by `(profile, key)`. Values are stored
//! as the raw text handed in, so corrupt payloads survive a round trip and
//! can be healed by the snapshot layer.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use isonnik_core::storage::KvStore;
use isonnik_types::error::RepositoryError;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use super::validate_name;

const SCHEMA: &str = r#"CREATE TABLE IF NOT EXISTS profile_kv (
    profile TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (profile, key)
)"#;

/// SQLite-backed implementation of `KvStore`, scoped to one profile.
pub struct SqliteKvStore {
    pool: SqlitePool,
    profile: String,
}

impl SqliteKvStore {
    /// Open (creating if missing) the database at `path` in WAL mode and
    /// make sure the table exists.
    pub async fn open(path: &Path, profile: &str) -> Result<Self, RepositoryError> {
        validate_name(profile)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(Self {
            pool,
            profile: profile.to_string(),
        })
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }
}

impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query("SELECT value FROM profile_kv WHERE profile = ? AND key = ?")
            .bind(&self.profile)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| row.try_get::<String, _>("value"))
            .transpose()
            .map_err(|e| RepositoryError::Query(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO profile_kv (profile, key, value, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (profile, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
        )
        .bind(&self.profile)
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM profile_kv WHERE profile = ? AND key = ?")
            .bind(&self.profile)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}
