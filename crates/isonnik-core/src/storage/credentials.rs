//! Durable home of the bearer credential.

use std::sync::Arc;

use isonnik_types::auth::AuthToken;
use isonnik_types::error::RepositoryError;

use super::{KvStore, keys};

/// Reads, writes and clears the [`AuthToken`] for this profile.
pub struct CredentialStore<S> {
    store: Arc<S>,
}

impl<S> Clone for CredentialStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KvStore> CredentialStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The stored token, or `None` when absent or blank.
    pub async fn load(&self) -> Result<Option<AuthToken>, RepositoryError> {
        let raw = self.store.get(keys::AUTH_TOKEN).await?;
        Ok(raw
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(AuthToken::new))
    }

    pub async fn save(&self, token: &AuthToken) -> Result<(), RepositoryError> {
        self.store.set(keys::AUTH_TOKEN, token.expose()).await
    }

    pub async fn clear(&self) -> Result<(), RepositoryError> {
        self.store.delete(keys::AUTH_TOKEN).await
    }
}
