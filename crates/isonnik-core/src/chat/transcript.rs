//! The transcript a dispatcher writes into.
//!
//! Every append is followed by a save of the whole snapshot before the call
//! returns. The in-memory copy sits behind a `tokio::sync::Mutex` that is
//! only held for the read-modify-write, never across a network call.

use std::future::Future;
use std::sync::Arc;

use isonnik_types::chat::{Message, Session};
use isonnik_types::error::RepositoryError;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::storage::snapshot::SnapshotStore;
use crate::storage::{KvStore, keys};

/// The conversation an append landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The single resident session.
    Resident,
    Thread(Uuid),
}

/// Result of appending to a specific conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Stored in the conversation currently on screen.
    Visible,
    /// Stored in a conversation that is no longer the open one.
    Background,
    /// The conversation no longer exists; nothing was stored.
    Gone,
}

/// A conversation that messages can be appended to.
pub trait Transcript: Send + Sync {
    /// Whether there is a conversation to append to right now.
    fn is_open(&self) -> impl Future<Output = bool> + Send;

    /// Messages of the open conversation, `None` when nothing is open.
    fn messages(&self) -> impl Future<Output = Option<Vec<Message>>> + Send;

    /// Append to the open conversation and persist. `Ok(None)` when nothing
    /// is open.
    fn append(
        &self,
        message: Message,
    ) -> impl Future<Output = Result<Option<Slot>, RepositoryError>> + Send;

    /// Append to the conversation an earlier append landed in, whether or
    /// not it is still the open one.
    fn append_to(
        &self,
        slot: Slot,
        message: Message,
    ) -> impl Future<Output = Result<Delivery, RepositoryError>> + Send;

    /// Replace every message of the open conversation and persist.
    fn replace(
        &self,
        messages: Vec<Message>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// The single resident session of the primary client.
pub struct SingleChat<S> {
    snapshots: SnapshotStore<S, Session>,
    session: Mutex<Session>,
}

impl<S: KvStore> SingleChat<S> {
    /// Nothing is read from storage until [`SingleChat::load`] runs; until
    /// then the transcript holds only the greeting.
    pub fn new(store: Arc<S>, welcome: &str) -> Self {
        let default = Session::welcome(welcome);
        Self {
            snapshots: SnapshotStore::new(store, keys::SESSION, default.clone()),
            session: Mutex::new(default),
        }
    }

    /// Read the stored session into memory, healing it when needed.
    pub async fn load(&self) -> Result<Session, RepositoryError> {
        let stored = self.snapshots.load().await?;
        *self.session.lock().await = stored.clone();
        Ok(stored)
    }

    /// Drop the stored session and fall back to the greeting in memory.
    pub async fn clear(&self) -> Result<(), RepositoryError> {
        self.snapshots.clear().await?;
        *self.session.lock().await = self.snapshots.default_value();
        Ok(())
    }

    /// Re-seed the client-authored greeting and persist it.
    pub async fn reset_to_welcome(&self) -> Result<Session, RepositoryError> {
        let welcome = self.snapshots.default_value();
        self.replace(welcome.messages.clone()).await?;
        Ok(welcome)
    }

    pub async fn snapshot(&self) -> Session {
        self.session.lock().await.clone()
    }
}

impl<S: KvStore> Transcript for SingleChat<S> {
    async fn is_open(&self) -> bool {
        true
    }

    async fn messages(&self) -> Option<Vec<Message>> {
        Some(self.session.lock().await.messages.clone())
    }

    async fn append(&self, message: Message) -> Result<Option<Slot>, RepositoryError> {
        let mut session = self.session.lock().await;
        let mut next = session.clone();
        next.messages.push(message);
        self.snapshots.save(&next).await?;
        *session = next;
        Ok(Some(Slot::Resident))
    }

    async fn append_to(&self, slot: Slot, message: Message) -> Result<Delivery, RepositoryError> {
        match slot {
            Slot::Resident => {
                self.append(message).await?;
                Ok(Delivery::Visible)
            }
            Slot::Thread(_) => Ok(Delivery::Gone),
        }
    }

    async fn replace(&self, messages: Vec<Message>) -> Result<(), RepositoryError> {
        let mut session = self.session.lock().await;
        let next = Session { messages };
        self.snapshots.save(&next).await?;
        *session = next;
        Ok(())
    }
}
