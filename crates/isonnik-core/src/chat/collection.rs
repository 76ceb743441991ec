//! Multi-chat bookkeeping: create, select, delete and list threads.
//!
//! Purely local. The active thread id lives in memory only; a fresh process
//! starts with nothing selected.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use isonnik_types::chat::{ChatCollection, ChatThread, Message};
use isonnik_types::error::RepositoryError;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::transcript::{Delivery, Slot, Transcript};
use crate::render::SessionSink;
use crate::storage::snapshot::SnapshotStore;
use crate::storage::{KvStore, keys};

/// Preview shown for a thread without messages.
pub const EMPTY_PREVIEW: &str = "No messages yet";

/// One row of the session list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub id: Uuid,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub preview: String,
    pub message_count: usize,
}

impl ChatSummary {
    fn from_thread(thread: &ChatThread) -> Self {
        Self {
            id: thread.id,
            title: thread.title.clone(),
            updated_at: thread.updated_at,
            preview: thread.last_text().unwrap_or(EMPTY_PREVIEW).to_string(),
            message_count: thread.messages.len(),
        }
    }

    /// Case-insensitive substring match over title and preview.
    fn matches(&self, needle: &str) -> bool {
        let haystack = format!("{} {}", self.title, self.preview).to_lowercase();
        haystack.contains(&needle.to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    NotFound,
    Removed { was_active: bool },
}

struct State {
    chats: ChatCollection,
    active: Option<Uuid>,
}

pub struct ChatCollectionService<S> {
    snapshots: SnapshotStore<S, ChatCollection>,
    state: Mutex<State>,
}

impl<S: KvStore> ChatCollectionService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            snapshots: SnapshotStore::new(store, keys::CHATS, ChatCollection::default()),
            state: Mutex::new(State {
                chats: ChatCollection::default(),
                active: None,
            }),
        }
    }

    /// Read the stored collection, healing it when needed.
    pub async fn load(&self) -> Result<usize, RepositoryError> {
        let chats = self.snapshots.load().await?;
        let count = chats.chats.len();
        let mut state = self.state.lock().await;
        if state.active.is_some_and(|id| chats.get(&id).is_none()) {
            state.active = None;
        }
        state.chats = chats;
        Ok(count)
    }

    /// Create an empty thread titled after the current local time and select it.
    pub async fn create(&self, sink: &dyn SessionSink) -> Result<ChatThread, RepositoryError> {
        let now = Utc::now();
        let thread = ChatThread {
            id: Uuid::now_v7(),
            title: format!("Dream from {}", now.with_timezone(&Local).format("%H:%M")),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        };

        let mut state = self.state.lock().await;
        let mut next = state.chats.clone();
        next.chats.push(thread.clone());
        self.snapshots.save(&next).await?;
        state.chats = next;
        state.active = Some(thread.id);
        drop(state);

        info!(chat_id = %thread.id, "Chat created");
        sink.on_session_replaced(&thread.messages);
        Ok(thread)
    }

    /// Make `id` the active thread and render it. `None` if no such thread.
    pub async fn select(
        &self,
        id: &Uuid,
        sink: &dyn SessionSink,
    ) -> Option<ChatThread> {
        let mut state = self.state.lock().await;
        let thread = state.chats.get(id)?.clone();
        state.active = Some(thread.id);
        drop(state);

        sink.on_session_replaced(&thread.messages);
        Some(thread)
    }

    pub async fn active_id(&self) -> Option<Uuid> {
        self.state.lock().await.active
    }

    /// Find a thread by full id or by a unique id prefix.
    pub async fn resolve(&self, id_or_prefix: &str) -> Option<Uuid> {
        let state = self.state.lock().await;
        let needle = id_or_prefix.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let mut matches = state
            .chats
            .chats
            .iter()
            .filter(|c| c.id.to_string().starts_with(&needle));
        match (matches.next(), matches.next()) {
            (Some(thread), None) => Some(thread.id),
            _ => None,
        }
    }

    /// Remove a thread. Deleting the active one clears the transcript.
    pub async fn delete(
        &self,
        id: &Uuid,
        sink: &dyn SessionSink,
    ) -> Result<DeleteOutcome, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.chats.get(id).is_none() {
            return Ok(DeleteOutcome::NotFound);
        }
        let mut next = state.chats.clone();
        next.chats.retain(|c| c.id != *id);
        self.snapshots.save(&next).await?;
        state.chats = next;

        let was_active = state.active == Some(*id);
        if was_active {
            state.active = None;
        }
        drop(state);

        info!(chat_id = %id, was_active, "Chat deleted");
        if was_active {
            sink.on_session_replaced(&[]);
        }
        Ok(DeleteOutcome::Removed { was_active })
    }

    /// Threads sorted by `updated_at`, newest first, optionally filtered.
    pub async fn list(&self, filter: Option<&str>) -> Vec<ChatSummary> {
        let state = self.state.lock().await;
        let mut summaries: Vec<ChatSummary> = state
            .chats
            .chats
            .iter()
            .map(ChatSummary::from_thread)
            .filter(|s| filter.is_none_or(|f| s.matches(f)))
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    /// Forget every thread (logout).
    pub async fn clear(&self) -> Result<(), RepositoryError> {
        self.snapshots.clear().await?;
        let mut state = self.state.lock().await;
        state.chats = ChatCollection::default();
        state.active = None;
        Ok(())
    }

    /// Apply `edit` to thread `id` on a copy, save it, then commit.
    /// `Ok(false)` when the thread does not exist.
    async fn edit_thread(
        &self,
        state: &mut State,
        id: Uuid,
        edit: impl FnOnce(&mut ChatThread),
    ) -> Result<bool, RepositoryError> {
        let mut next = state.chats.clone();
        let Some(thread) = next.get_mut(&id) else {
            return Ok(false);
        };
        edit(thread);
        thread.updated_at = Utc::now();
        self.snapshots.save(&next).await?;
        state.chats = next;
        Ok(true)
    }
}

impl<S: KvStore> Transcript for ChatCollectionService<S> {
    async fn is_open(&self) -> bool {
        let state = self.state.lock().await;
        state.active.is_some_and(|id| state.chats.get(&id).is_some())
    }

    async fn messages(&self) -> Option<Vec<Message>> {
        let state = self.state.lock().await;
        let id = state.active?;
        state.chats.get(&id).map(|c| c.messages.clone())
    }

    async fn append(&self, message: Message) -> Result<Option<Slot>, RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(id) = state.active else {
            return Ok(None);
        };
        let appended = self
            .edit_thread(&mut state, id, |thread| thread.messages.push(message))
            .await?;
        Ok(appended.then_some(Slot::Thread(id)))
    }

    async fn append_to(&self, slot: Slot, message: Message) -> Result<Delivery, RepositoryError> {
        let Slot::Thread(id) = slot else {
            return Ok(Delivery::Gone);
        };
        let mut state = self.state.lock().await;
        let appended = self
            .edit_thread(&mut state, id, |thread| thread.messages.push(message))
            .await?;
        Ok(match (appended, state.active == Some(id)) {
            (false, _) => Delivery::Gone,
            (true, true) => Delivery::Visible,
            (true, false) => Delivery::Background,
        })
    }

    async fn replace(&self, messages: Vec<Message>) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        if let Some(id) = state.active {
            self.edit_thread(&mut state, id, |thread| thread.messages = messages)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::NullSink;
    use crate::storage::memory::MemoryKvStore;
    use crate::test_support::{FlakyStore, RecordingSink, SinkEvent};
    use chrono::TimeZone;

    fn service() -> (Arc<MemoryKvStore>, ChatCollectionService<MemoryKvStore>) {
        let store = Arc::new(MemoryKvStore::new());
        (Arc::clone(&store), ChatCollectionService::new(store))
    }

    fn thread(title: &str, minute: u32, messages: Vec<Message>) -> ChatThread {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 10, minute, 0).unwrap();
        ChatThread {
            id: Uuid::now_v7(),
            title: title.to_string(),
            created_at: at,
            updated_at: at,
            messages,
        }
    }

    #[tokio::test]
    async fn test_create_selects_and_persists() {
        let (store, chats) = service();
        let sink = RecordingSink::default();

        let created = chats.create(&sink).await.unwrap();
        assert!(created.title.starts_with("Dream from "));
        assert_eq!(chats.active_id().await, Some(created.id));
        assert!(chats.is_open().await);
        assert_eq!(sink.events(), vec![SinkEvent::Replaced(vec![])]);

        let stored: ChatCollection =
            serde_json::from_str(&store.raw(keys::CHATS).await.unwrap()).unwrap();
        assert_eq!(stored.chats, vec![created]);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let (_, chats) = service();
        let a = chats.create(&NullSink).await.unwrap();
        let b = chats.create(&NullSink).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_append_refreshes_updated_at_and_list_order() {
        let (_, chats) = service();
        let first = chats.create(&NullSink).await.unwrap();
        let second = chats.create(&NullSink).await.unwrap();

        chats.select(&first.id, &NullSink).await.unwrap();
        chats.append(Message::user("the sea")).await.unwrap();

        let list = chats.list(None).await;
        assert_eq!(list[0].id, first.id);
        assert_eq!(list[0].preview, "the sea");
        assert!(list[0].updated_at >= first.updated_at);
        assert_eq!(list[1].id, second.id);
        assert_eq!(list[1].preview, EMPTY_PREVIEW);
    }

    #[tokio::test]
    async fn test_list_sorts_descending_and_filters() {
        let store = Arc::new(MemoryKvStore::new());
        let collection = ChatCollection {
            chats: vec![
                thread("Dream from 10:01", 1, vec![Message::bot("Flying means freedom")]),
                thread("Dream from 10:30", 30, vec![Message::user("teeth falling out")]),
                thread("Dream from 10:15", 15, vec![]),
            ],
        };
        store
            .set(keys::CHATS, &serde_json::to_string(&collection).unwrap())
            .await
            .unwrap();
        let chats = ChatCollectionService::new(store);
        assert_eq!(chats.load().await.unwrap(), 3);

        let titles: Vec<String> = chats.list(None).await.into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["Dream from 10:30", "Dream from 10:15", "Dream from 10:01"]);

        let hits = chats.list(Some("FREEDOM")).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Dream from 10:01");

        assert_eq!(chats.list(Some("10:15")).await.len(), 1);
        assert_eq!(chats.list(Some("no messages")).await.len(), 1);
        assert!(chats.list(Some("nightmare")).await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_active_clears_transcript() {
        let (_, chats) = service();
        let created = chats.create(&NullSink).await.unwrap();
        let sink = RecordingSink::default();

        let outcome = chats.delete(&created.id, &sink).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Removed { was_active: true });
        assert_eq!(chats.active_id().await, None);
        assert!(!chats.is_open().await);
        assert_eq!(sink.events(), vec![SinkEvent::Replaced(vec![])]);
        assert_eq!(chats.append(Message::user("x")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_inactive_keeps_selection() {
        let (_, chats) = service();
        let old = chats.create(&NullSink).await.unwrap();
        let current = chats.create(&NullSink).await.unwrap();
        let sink = RecordingSink::default();

        let outcome = chats.delete(&old.id, &sink).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Removed { was_active: false });
        assert_eq!(chats.active_id().await, Some(current.id));
        assert!(sink.events().is_empty());

        assert_eq!(chats.delete(&old.id, &sink).await.unwrap(), DeleteOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_select_unknown_id() {
        let (_, chats) = service();
        assert!(chats.select(&Uuid::now_v7(), &NullSink).await.is_none());
        assert!(chats.messages().await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_by_prefix() {
        let (_, chats) = service();
        let created = chats.create(&NullSink).await.unwrap();
        let full = created.id.to_string();

        assert_eq!(chats.resolve(&full).await, Some(created.id));
        assert_eq!(chats.resolve(&full[..13]).await, Some(created.id));
        assert_eq!(chats.resolve("").await, None);
        assert_eq!(chats.resolve("zzzz").await, None);
    }

    #[tokio::test]
    async fn test_corrupt_collection_heals_to_empty() {
        let store = Arc::new(MemoryKvStore::new().with_entry(keys::CHATS, "[1,2"));
        let chats = ChatCollectionService::new(Arc::clone(&store));
        assert_eq!(chats.load().await.unwrap(), 0);
        assert_eq!(store.raw(keys::CHATS).await.as_deref(), Some(r#"{"chats":[]}"#));
    }

    #[tokio::test]
    async fn test_append_to_targets_original_thread() {
        let (_, chats) = service();
        let first = chats.create(&NullSink).await.unwrap();
        let slot = chats.append(Message::user("question")).await.unwrap().unwrap();
        assert_eq!(slot, Slot::Thread(first.id));

        let second = chats.create(&NullSink).await.unwrap();
        let delivery = chats.append_to(slot, Message::bot("answer")).await.unwrap();
        assert_eq!(delivery, Delivery::Background);
        assert_eq!(chats.messages().await.unwrap(), vec![]);
        assert_eq!(chats.active_id().await, Some(second.id));

        chats.select(&first.id, &NullSink).await.unwrap();
        assert_eq!(
            chats.messages().await.unwrap(),
            vec![Message::user("question"), Message::bot("answer")]
        );
        assert_eq!(
            chats.append_to(slot, Message::bot("more")).await.unwrap(),
            Delivery::Visible
        );

        chats.delete(&first.id, &NullSink).await.unwrap();
        assert_eq!(
            chats.append_to(slot, Message::bot("late")).await.unwrap(),
            Delivery::Gone
        );
    }

    #[tokio::test]
    async fn test_failed_save_leaves_collection_untouched() {
        let store = Arc::new(FlakyStore::new());
        let chats = ChatCollectionService::new(Arc::clone(&store));
        let kept = chats.create(&NullSink).await.unwrap();

        store.fail_writes(true);
        assert!(chats.create(&NullSink).await.is_err());
        assert!(chats.append(Message::user("lost")).await.is_err());
        assert!(chats.delete(&kept.id, &NullSink).await.is_err());

        let list = chats.list(None).await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].message_count, 0);
        assert_eq!(chats.active_id().await, Some(kept.id));

        store.fail_writes(false);
        chats.append(Message::user("saved")).await.unwrap();
        let stored: ChatCollection =
            serde_json::from_str(&store.raw(keys::CHATS).await.unwrap()).unwrap();
        assert_eq!(stored.chats.len(), 1);
        assert_eq!(stored.chats[0].messages, vec![Message::user("saved")]);
    }
}
