//! Account lifecycle: login, registration and logout.
//!
//! The token is created by login and destroyed by logout. Logout also wipes
//! every per-profile snapshot so the next user of the device starts clean.

use std::sync::Arc;

use isonnik_types::auth::{AuthToken, LoginRequest, RegisterRequest};
use isonnik_types::error::{BackendError, ClientError, RepositoryError};
use tracing::{debug, info};

use crate::backend::ChatBackend;
use crate::chat::collection::ChatCollectionService;
use crate::chat::transcript::SingleChat;
use crate::quota::tracker::QuotaTracker;
use crate::storage::KvStore;
use crate::storage::credentials::CredentialStore;

pub struct AccountService<S, B> {
    backend: Arc<B>,
    credentials: CredentialStore<S>,
    chat: Arc<SingleChat<S>>,
    chats: Arc<ChatCollectionService<S>>,
    quota: QuotaTracker<S>,
}

impl<S: KvStore, B: ChatBackend> AccountService<S, B> {
    pub fn new(
        backend: Arc<B>,
        credentials: CredentialStore<S>,
        chat: Arc<SingleChat<S>>,
        chats: Arc<ChatCollectionService<S>>,
        quota: QuotaTracker<S>,
    ) -> Self {
        Self {
            backend,
            credentials,
            chat,
            chats,
            quota,
        }
    }

    pub async fn is_authenticated(&self) -> Result<bool, RepositoryError> {
        Ok(self.credentials.load().await?.is_some())
    }

    /// Exchange email and password for a token and store it.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ClientError::InvalidInput(
                "email and password are required".to_string(),
            ));
        }

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.backend.login(&request).await?;

        let token = response
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| BackendError::Deserialization("login response carried no token".to_string()))?;

        self.credentials.save(&AuthToken::new(token)).await?;
        info!("Logged in");
        Ok(())
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ClientError> {
        request.validate().map_err(ClientError::InvalidInput)?;
        self.backend.register(request).await?;
        info!("Account registered");
        Ok(())
    }

    /// Tell the backend (best effort) and wipe all local state.
    pub async fn logout(&self) -> Result<(), ClientError> {
        if let Some(token) = self.credentials.load().await? {
            if let Err(e) = self.backend.logout(&token).await {
                debug!(error = %e, "Backend logout failed, clearing local state anyway");
            }
        }

        self.credentials.clear().await?;
        self.chat.clear().await?;
        self.chats.clear().await?;
        self.quota.clear().await?;
        info!("Logged out, local state cleared");
        Ok(())
    }
}
