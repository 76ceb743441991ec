//! "Clear context": ask the backend to forget the conversation and re-seed
//! the local greeting.

use std::sync::Arc;

use isonnik_types::chat::Session;
use isonnik_types::error::{BackendError, ClientError};
use tracing::{info, warn};

use super::transcript::SingleChat;
use crate::backend::ChatBackend;
use crate::render::{Notice, SessionSink};
use crate::storage::KvStore;
use crate::storage::credentials::CredentialStore;

pub struct ContextService<S, B> {
    backend: Arc<B>,
    credentials: CredentialStore<S>,
    chat: Arc<SingleChat<S>>,
}

impl<S: KvStore, B: ChatBackend> ContextService<S, B> {
    pub fn new(backend: Arc<B>, credentials: CredentialStore<S>, chat: Arc<SingleChat<S>>) -> Self {
        Self {
            backend,
            credentials,
            chat,
        }
    }

    /// Clear the remote context, keeping the greeting.
    ///
    /// Any answer from the backend, OK or not, resets the local transcript.
    /// Only a request that got no answer at all leaves it untouched.
    pub async fn clear_context(&self, sink: &dyn SessionSink) -> Result<Session, ClientError> {
        let token = self
            .credentials
            .load()
            .await?
            .ok_or(ClientError::NotAuthenticated)?;

        match self.backend.clear_context(&token, true).await {
            Ok(()) => {}
            Err(e @ BackendError::Network(_)) => {
                warn!(error = %e, "Clear context request failed");
                return Err(e.into());
            }
            Err(e) => warn!(error = %e, "Backend refused to clear context, resetting locally"),
        }

        let session = self.chat.reset_to_welcome().await?;
        info!("Chat context cleared");
        sink.on_session_replaced(&session.messages);
        sink.on_notice(&Notice::ContextCleared);
        Ok(session)
    }
}
