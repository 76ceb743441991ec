//! Device-scoped durable storage.
//!
//! `KvStore` is the port: one opaque string per key, scoped to a single
//! profile by the implementation. Values are kept raw so that a corrupt
//! payload can be read back, detected and healed by [`snapshot::SnapshotStore`].

pub mod credentials;
pub mod memory;
pub mod snapshot;

use isonnik_types::error::RepositoryError;

/// Logical storage keys.
pub mod keys {
    /// Single-chat session blob.
    pub const SESSION: &str = "session";
    /// Multi-chat collection blob.
    pub const CHATS: &str = "chats";
    /// Quota snapshot.
    pub const QUOTA: &str = "quota";
    /// Bearer credential.
    pub const AUTH_TOKEN: &str = "auth_token";
}

/// Trait for profile-scoped key-value persistent storage.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in isonnik-infra, plus [`memory::MemoryKvStore`] here.
pub trait KvStore: Send + Sync {
    /// Get the raw value for a key. Returns None if the key does not exist.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, RepositoryError>> + Send;

    /// Replace the value for a key (upsert).
    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a key. No-op if the key does not exist.
    fn delete(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
