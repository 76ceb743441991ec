//! History Reconciler: one-shot adoption of remote history at startup.
//!
//! With a credential, the remote history is fetched once. A non-empty answer
//! replaces the local session, an empty one resets it to the greeting, and
//! any failure keeps whatever is stored locally. There is no continuous
//! sync: the last successful reconciliation wins until the next start.

use std::sync::Arc;

use isonnik_types::api::HistoryRecord;
use isonnik_types::chat::{Message, Session};
use isonnik_types::error::ClientError;
use tracing::{info, warn};

use super::transcript::{SingleChat, Transcript};
use crate::backend::ChatBackend;
use crate::render::SessionSink;
use crate::storage::KvStore;
use crate::storage::credentials::CredentialStore;
use crate::text::normalize;

/// Where the session that won reconciliation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    Remote,
    /// The backend answered with no history; the greeting was re-seeded.
    RemoteEmpty,
    LocalCache,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub session: Session,
    pub source: SessionSource,
}

/// Map remote records to messages. Every text goes through the normalizer.
pub fn session_from_history(records: &[HistoryRecord]) -> Session {
    let messages = records
        .iter()
        .map(|record| {
            let text = normalize(record.text());
            if record.is_user() {
                Message::user(text)
            } else {
                Message::bot(text)
            }
        })
        .collect();
    Session { messages }
}

pub struct HistoryReconciler<S, B> {
    backend: Arc<B>,
    credentials: CredentialStore<S>,
    chat: Arc<SingleChat<S>>,
}

impl<S: KvStore, B: ChatBackend> HistoryReconciler<S, B> {
    pub fn new(backend: Arc<B>, credentials: CredentialStore<S>, chat: Arc<SingleChat<S>>) -> Self {
        Self {
            backend,
            credentials,
            chat,
        }
    }

    /// Decide the authoritative session and render it.
    ///
    /// Without a credential this fails with `NotAuthenticated` before
    /// anything is read from or written to the session store.
    pub async fn initialize_session(
        &self,
        sink: &dyn SessionSink,
    ) -> Result<Reconciled, ClientError> {
        let Some(token) = self.credentials.load().await? else {
            info!("No credential on this device, redirecting to login");
            return Err(ClientError::NotAuthenticated);
        };

        let reconciled = match self.backend.fetch_history(&token).await {
            Ok(records) if records.is_empty() => {
                info!("Remote history is empty, seeding greeting");
                let session = self.chat.reset_to_welcome().await?;
                Reconciled {
                    session,
                    source: SessionSource::RemoteEmpty,
                }
            }
            Ok(records) => {
                let session = session_from_history(&records);
                self.chat.replace(session.messages.clone()).await?;
                info!(messages = session.messages.len(), "Adopted remote history");
                Reconciled {
                    session,
                    source: SessionSource::Remote,
                }
            }
            Err(e) => {
                warn!(error = %e, "History fetch failed, using local session");
                let session = self.chat.load().await?;
                Reconciled {
                    session,
                    source: SessionSource::LocalCache,
                }
            }
        };

        sink.on_session_replaced(&reconciled.session.messages);
        Ok(reconciled)
    }
}
