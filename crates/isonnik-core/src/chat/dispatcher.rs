//! Message Dispatcher: one send, from optimistic append to quota update.
//!
//! The user's message is appended and persisted before the network call and
//! is never rolled back. Only the reply is uncertain, so a failure shows up
//! as a notice in place of a reply. Remote failures are outcomes, not
//! errors: `send` only returns `Err` when local storage fails.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use isonnik_types::api::EMPTY_REPLY_PLACEHOLDER;
use isonnik_types::chat::Message;
use isonnik_types::error::{BackendError, RepositoryError};
use tracing::{debug, info, warn};

use super::transcript::{Delivery, Transcript};
use crate::backend::ChatBackend;
use crate::quota::gate::{LimitsVerdict, check_limits};
use crate::quota::tracker::QuotaTracker;
use crate::render::{Notice, SessionSink};
use crate::storage::KvStore;
use crate::storage::credentials::CredentialStore;
use crate::text::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Reject a send while another one is awaiting its reply.
    pub single_flight: bool,
    /// Ask `/api/chat/limits` before appending anything.
    pub limits_gate: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            single_flight: true,
            limits_gate: false,
        }
    }
}

/// How a single send ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Empty or whitespace-only input. Nothing happened.
    EmptyInput,
    /// Another send is still in flight. Nothing happened.
    Busy,
    NoActiveChat,
    NotAuthenticated,
    /// Quota is used up; the payment prompt was opened.
    SubscriptionRequired,
    Replied(Message),
    ServerError { status: u16, message: String },
    NetworkError(String),
}

/// Clears the in-flight flag when the send finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct MessageDispatcher<T, S, B> {
    transcript: Arc<T>,
    backend: Arc<B>,
    credentials: CredentialStore<S>,
    quota: QuotaTracker<S>,
    options: DispatchOptions,
    in_flight: AtomicBool,
}

impl<T: Transcript, S: KvStore, B: ChatBackend> MessageDispatcher<T, S, B> {
    pub fn new(
        transcript: Arc<T>,
        backend: Arc<B>,
        credentials: CredentialStore<S>,
        quota: QuotaTracker<S>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            transcript,
            backend,
            credentials,
            quota,
            options,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn transcript(&self) -> &Arc<T> {
        &self.transcript
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Send one user message.
    ///
    /// Order within a call is fixed: validate, append locally, call the
    /// backend, then handle the response completely before the quota
    /// indicator is rendered.
    pub async fn send(
        &self,
        raw: &str,
        sink: &dyn SessionSink,
    ) -> Result<DispatchOutcome, RepositoryError> {
        let text = raw.trim();
        if text.is_empty() {
            return Ok(DispatchOutcome::EmptyInput);
        }

        let _guard = if self.options.single_flight {
            match InFlight::acquire(&self.in_flight) {
                Some(guard) => Some(guard),
                None => {
                    debug!("Send rejected, another one is in flight");
                    sink.on_notice(&Notice::Busy);
                    return Ok(DispatchOutcome::Busy);
                }
            }
        } else {
            None
        };

        if !self.transcript.is_open().await {
            sink.on_notice(&Notice::NoActiveChat);
            return Ok(DispatchOutcome::NoActiveChat);
        }

        let Some(token) = self.credentials.load().await? else {
            sink.on_notice(&Notice::NotAuthenticated);
            return Ok(DispatchOutcome::NotAuthenticated);
        };

        if self.options.limits_gate
            && check_limits(self.backend.as_ref()).await == LimitsVerdict::PaymentRequired
        {
            sink.on_notice(&Notice::PaymentRequired);
            return Ok(DispatchOutcome::SubscriptionRequired);
        }

        let user = Message::user(text);
        let Some(slot) = self.transcript.append(user.clone()).await? else {
            sink.on_notice(&Notice::NoActiveChat);
            return Ok(DispatchOutcome::NoActiveChat);
        };
        sink.on_message_appended(&user);

        let response = self
            .backend
            .send_message(&token, text)
            .await
            .and_then(|response| {
                if response.needs_subscription() {
                    Err(BackendError::SubscriptionRequired {
                        message: response.error.clone(),
                    })
                } else {
                    Ok(response)
                }
            });

        match response {
            Ok(response) => {
                let mut reply_text = normalize(response.reply_text());
                if reply_text.is_empty() {
                    reply_text = EMPTY_REPLY_PLACEHOLDER.to_string();
                }
                let reply = Message::bot(reply_text);

                match self.transcript.append_to(slot, reply.clone()).await? {
                    Delivery::Visible => sink.on_message_appended(&reply),
                    Delivery::Background => {
                        debug!(?slot, "Reply stored in a conversation that is no longer open")
                    }
                    Delivery::Gone => {
                        warn!(?slot, "Conversation deleted while awaiting the reply, dropping it")
                    }
                }

                let quota = self.quota.record_reply().await?;
                sink.on_quota_changed(&quota, &quota.indicator(self.quota.limit()));
                info!(reply_len = reply.text.len(), "Reply received");
                Ok(DispatchOutcome::Replied(reply))
            }
            Err(BackendError::Unauthorized) => {
                warn!("Backend rejected the credential");
                sink.on_notice(&Notice::NotAuthenticated);
                Ok(DispatchOutcome::NotAuthenticated)
            }
            Err(BackendError::SubscriptionRequired { .. }) => {
                info!("Free quota exhausted, opening payment prompt");
                let quota = self.quota.exhaust().await?;
                sink.on_quota_changed(&quota, &quota.indicator(self.quota.limit()));
                sink.on_notice(&Notice::PaymentRequired);
                Ok(DispatchOutcome::SubscriptionRequired)
            }
            Err(BackendError::Status { status, message }) => {
                warn!(status, "Send failed with server error");
                sink.on_notice(&Notice::ServerError(message.clone()));
                Ok(DispatchOutcome::ServerError { status, message })
            }
            Err(e @ (BackendError::Network(_) | BackendError::Deserialization(_))) => {
                warn!(error = %e, "Send failed without a usable response");
                let message = e.to_string();
                sink.on_notice(&Notice::NetworkError(message.clone()));
                Ok(DispatchOutcome::NetworkError(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::collection::ChatCollectionService;
    use crate::chat::transcript::SingleChat;
    use crate::render::NullSink;
    use crate::storage::keys;
    use crate::storage::memory::MemoryKvStore;
    use crate::test_support::{FakeBackend, RecordingSink, SinkEvent, reply};
    use isonnik_types::api::{ChatLimits, SendMessageResponse};
    use isonnik_types::auth::AuthToken;
    use isonnik_types::chat::Session;
    use isonnik_types::quota::QuotaState;
    use tokio::sync::Semaphore;

    type Dispatcher = MessageDispatcher<SingleChat<MemoryKvStore>, MemoryKvStore, FakeBackend>;

    struct Harness {
        store: Arc<MemoryKvStore>,
        dispatcher: Dispatcher,
        sink: RecordingSink,
    }

    impl Harness {
        async fn new(backend: FakeBackend, options: DispatchOptions, with_token: bool) -> Self {
            let store = Arc::new(MemoryKvStore::new());
            let credentials = CredentialStore::new(Arc::clone(&store));
            if with_token {
                credentials.save(&AuthToken::new("tok")).await.unwrap();
            }
            let chat = Arc::new(SingleChat::new(Arc::clone(&store), "hello"));
            chat.load().await.unwrap();
            let quota = QuotaTracker::new(Arc::clone(&store), 5);
            let dispatcher =
                MessageDispatcher::new(chat, Arc::new(backend), credentials, quota, options);
            Self {
                store,
                dispatcher,
                sink: RecordingSink::default(),
            }
        }

        async fn send(&self, text: &str) -> DispatchOutcome {
            self.dispatcher.send(text, &self.sink).await.unwrap()
        }

        async fn stored_session(&self) -> Session {
            serde_json::from_str(&self.store.raw(keys::SESSION).await.unwrap()).unwrap()
        }

        async fn stored_quota(&self) -> QuotaState {
            match self.store.raw(keys::QUOTA).await {
                Some(raw) => serde_json::from_str(&raw).unwrap(),
                None => QuotaState::default(),
            }
        }

        fn backend(&self) -> &FakeBackend {
            &self.dispatcher.backend
        }
    }

    #[tokio::test]
    async fn test_whitespace_input_has_no_side_effects() {
        let h = Harness::new(FakeBackend::new(), DispatchOptions::default(), true).await;
        let before = h.store.raw(keys::SESSION).await;

        for input in ["", "  ", "\n\t "] {
            assert_eq!(h.send(input).await, DispatchOutcome::EmptyInput);
        }
        assert!(h.backend().calls().is_empty());
        assert!(h.sink.events().is_empty());
        assert_eq!(h.store.raw(keys::SESSION).await, before);
    }

    #[tokio::test]
    async fn test_successful_send_appends_both_and_decrements_quota() {
        let backend = FakeBackend::new().with_reply(Ok(reply("**Water** means _change_")));
        let h = Harness::new(backend, DispatchOptions::default(), true).await;

        let outcome = h.send("  I dreamed of the sea ").await;
        assert_eq!(outcome, DispatchOutcome::Replied(Message::bot("Water means change")));

        assert_eq!(h.backend().sent(), vec!["I dreamed of the sea"]);
        assert_eq!(
            h.stored_session().await.messages,
            vec![
                Message::bot("hello"),
                Message::user("I dreamed of the sea"),
                Message::bot("Water means change"),
            ]
        );
        assert_eq!(h.stored_quota().await.free_left, 4);
        assert_eq!(
            h.sink.events(),
            vec![
                SinkEvent::Appended(Message::user("I dreamed of the sea")),
                SinkEvent::Appended(Message::bot("Water means change")),
                SinkEvent::Quota("4 / 5".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_raw_user_text_is_sent_unnormalized() {
        let h = Harness::new(FakeBackend::new(), DispatchOptions::default(), true).await;
        h.send("*stars* and a_b").await;
        assert_eq!(h.backend().sent(), vec!["*stars* and a_b"]);
        assert_eq!(h.stored_session().await.messages[1], Message::user("*stars* and a_b"));
    }

    #[tokio::test]
    async fn test_payment_required_forces_zero_free_and_no_bot_message() {
        let backend = FakeBackend::new().with_reply(Err(BackendError::SubscriptionRequired {
            message: Some("limit reached".to_string()),
        }));
        let h = Harness::new(backend, DispatchOptions::default(), true).await;

        assert_eq!(h.send("dream").await, DispatchOutcome::SubscriptionRequired);
        assert_eq!(h.stored_quota().await.free_left, 0);
        assert_eq!(
            h.stored_session().await.messages,
            vec![Message::bot("hello"), Message::user("dream")]
        );
        assert_eq!(h.sink.appended(), vec![Message::user("dream")]);
        assert_eq!(h.sink.notices(), vec![Notice::PaymentRequired]);
    }

    #[tokio::test]
    async fn test_ok_body_flagged_need_subscription_is_payment_required() {
        let flagged = SendMessageResponse {
            need_subscription: Some(true),
            ..Default::default()
        };
        let h = Harness::new(FakeBackend::new().with_reply(Ok(flagged)), DispatchOptions::default(), true).await;

        assert_eq!(h.send("dream").await, DispatchOutcome::SubscriptionRequired);
        assert_eq!(h.stored_quota().await.free_left, 0);
        assert_eq!(h.stored_session().await.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_leaves_quota_alone() {
        let backend = FakeBackend::new().with_reply(Err(BackendError::Unauthorized));
        let h = Harness::new(backend, DispatchOptions::default(), true).await;

        assert_eq!(h.send("dream").await, DispatchOutcome::NotAuthenticated);
        assert_eq!(h.stored_quota().await, QuotaState::default());
        assert_eq!(h.stored_session().await.messages.len(), 2);
        assert_eq!(h.sink.notices(), vec![Notice::NotAuthenticated]);
    }

    #[tokio::test]
    async fn test_missing_credential_aborts_before_any_write() {
        let h = Harness::new(FakeBackend::new(), DispatchOptions::default(), false).await;

        assert_eq!(h.send("dream").await, DispatchOutcome::NotAuthenticated);
        assert!(h.backend().calls().is_empty());
        assert_eq!(h.stored_session().await, Session::welcome("hello"));
        assert_eq!(h.sink.events(), vec![SinkEvent::Notice(Notice::NotAuthenticated)]);
    }

    #[tokio::test]
    async fn test_server_and_network_errors_keep_optimistic_message() {
        let backend = FakeBackend::new()
            .with_reply(Err(BackendError::Status { status: 500, message: "Server error".to_string() }))
            .with_reply(Err(BackendError::Network("connection refused".to_string())));
        let h = Harness::new(backend, DispatchOptions::default(), true).await;

        assert_eq!(
            h.send("first").await,
            DispatchOutcome::ServerError { status: 500, message: "Server error".to_string() }
        );
        assert!(matches!(h.send("second").await, DispatchOutcome::NetworkError(_)));

        assert_eq!(
            h.stored_session().await.messages,
            vec![Message::bot("hello"), Message::user("first"), Message::user("second")]
        );
        assert_eq!(h.stored_quota().await, QuotaState::default());
        let notices = h.sink.notices();
        assert_eq!(notices[0], Notice::ServerError("Server error".to_string()));
        assert!(matches!(notices[1], Notice::NetworkError(_)));
    }

    #[tokio::test]
    async fn test_subscribed_user_sends_three_messages() {
        let h = Harness::new(FakeBackend::new(), DispatchOptions::default(), true).await;
        let mut subscribed = QuotaState::default();
        subscribed.apply_subscription(true);
        h.dispatcher.quota.set_state(&subscribed).await.unwrap();

        for text in ["one", "two", "three"] {
            assert!(matches!(h.send(text).await, DispatchOutcome::Replied(_)));
        }
        let quota = h.stored_quota().await;
        assert_eq!(quota.total_sent, 3);
        assert_eq!(quota.free_left, 0);
        assert!(quota.has_subscription);
    }

    #[tokio::test]
    async fn test_empty_normalized_reply_uses_placeholder() {
        let h = Harness::new(FakeBackend::new().with_reply(Ok(reply("***"))), DispatchOptions::default(), true).await;
        assert_eq!(
            h.send("dream").await,
            DispatchOutcome::Replied(Message::bot(EMPTY_REPLY_PLACEHOLDER))
        );
    }

    #[tokio::test]
    async fn test_concurrent_send_is_rejected_while_in_flight() {
        let gate = Arc::new(Semaphore::new(0));
        let backend = FakeBackend::new()
            .with_send_gate(Arc::clone(&gate))
            .with_reply(Ok(reply("first reply")));
        let h = Harness::new(backend, DispatchOptions::default(), true).await;

        let (first, second) = tokio::join!(h.send("first"), async {
            let outcome = h.send("second").await;
            gate.add_permits(1);
            outcome
        });

        assert_eq!(first, DispatchOutcome::Replied(Message::bot("first reply")));
        assert_eq!(second, DispatchOutcome::Busy);
        assert_eq!(h.backend().sent(), vec!["first"]);
        assert_eq!(h.stored_session().await.messages.len(), 3);
        assert!(!h.dispatcher.is_busy());
    }

    #[tokio::test]
    async fn test_without_single_flight_both_sends_proceed() {
        let gate = Arc::new(Semaphore::new(0));
        let backend = FakeBackend::new().with_send_gate(Arc::clone(&gate));
        let options = DispatchOptions { single_flight: false, limits_gate: false };
        let h = Harness::new(backend, options, true).await;

        let (first, second) = tokio::join!(h.send("first"), async {
            tokio::task::yield_now().await;
            let outcome = h.send("second");
            gate.add_permits(2);
            outcome.await
        });

        assert!(matches!(first, DispatchOutcome::Replied(_)));
        assert!(matches!(second, DispatchOutcome::Replied(_)));
        assert_eq!(h.backend().sent(), vec!["first", "second"]);
        assert_eq!(h.stored_quota().await.free_left, 3);
    }

    #[tokio::test]
    async fn test_limits_gate_blocks_before_append() {
        let backend = FakeBackend::new().with_limits(Ok(ChatLimits { subscribed: false, remaining: 0 }));
        let options = DispatchOptions { single_flight: true, limits_gate: true };
        let h = Harness::new(backend, options, true).await;

        assert_eq!(h.send("dream").await, DispatchOutcome::SubscriptionRequired);
        assert_eq!(h.backend().calls(), vec!["chat_limits"]);
        assert_eq!(h.stored_session().await, Session::welcome("hello"));
        assert_eq!(h.sink.notices(), vec![Notice::PaymentRequired]);
    }

    #[tokio::test]
    async fn test_limits_gate_allows_when_remaining() {
        let options = DispatchOptions { single_flight: true, limits_gate: true };
        let h = Harness::new(FakeBackend::new(), options, true).await;

        assert!(matches!(h.send("dream").await, DispatchOutcome::Replied(_)));
        assert_eq!(h.backend().calls(), vec!["chat_limits", "send_message"]);
    }

    #[tokio::test]
    async fn test_reply_lands_in_thread_it_was_sent_from() {
        let store = Arc::new(MemoryKvStore::new());
        let credentials = CredentialStore::new(Arc::clone(&store));
        credentials.save(&AuthToken::new("tok")).await.unwrap();
        let chats = Arc::new(ChatCollectionService::new(Arc::clone(&store)));
        let first = chats.create(&NullSink).await.unwrap();
        let second = chats.create(&NullSink).await.unwrap();
        chats.select(&first.id, &NullSink).await.unwrap();

        let gate = Arc::new(Semaphore::new(0));
        let backend = FakeBackend::new()
            .with_send_gate(Arc::clone(&gate))
            .with_reply(Ok(reply("about the first dream")));
        let dispatcher = MessageDispatcher::new(
            Arc::clone(&chats),
            Arc::new(backend),
            credentials,
            QuotaTracker::new(Arc::clone(&store), 5),
            DispatchOptions::default(),
        );
        let sink = RecordingSink::default();

        let (outcome, _) = tokio::join!(dispatcher.send("first dream", &sink), async {
            tokio::task::yield_now().await;
            chats.select(&second.id, &NullSink).await.unwrap();
            gate.add_permits(1);
        });

        assert!(matches!(outcome.unwrap(), DispatchOutcome::Replied(_)));
        assert_eq!(chats.messages().await.unwrap(), vec![]);
        assert_eq!(sink.appended(), vec![Message::user("first dream")]);

        chats.select(&first.id, &NullSink).await.unwrap();
        assert_eq!(
            chats.messages().await.unwrap(),
            vec![Message::user("first dream"), Message::bot("about the first dream")]
        );
        assert_eq!(stored_quota(&store).await.free_left, 4);
    }

    #[tokio::test]
    async fn test_send_after_deleting_open_thread_has_no_chat() {
        let store = Arc::new(MemoryKvStore::new());
        let credentials = CredentialStore::new(Arc::clone(&store));
        credentials.save(&AuthToken::new("tok")).await.unwrap();
        let chats = Arc::new(ChatCollectionService::new(Arc::clone(&store)));
        let open = chats.create(&NullSink).await.unwrap();
        let dispatcher = MessageDispatcher::new(
            Arc::clone(&chats),
            Arc::new(FakeBackend::new()),
            credentials,
            QuotaTracker::new(Arc::clone(&store), 5),
            DispatchOptions::default(),
        );
        let sink = RecordingSink::default();

        chats.delete(&open.id, &sink).await.unwrap();
        assert_eq!(dispatcher.send("still there?", &sink).await.unwrap(), DispatchOutcome::NoActiveChat);

        assert_eq!(
            sink.events(),
            vec![SinkEvent::Replaced(vec![]), SinkEvent::Notice(Notice::NoActiveChat)]
        );
        assert!(dispatcher.backend.calls().is_empty());
        assert!(chats.list(None).await.is_empty());
    }

    async fn stored_quota(store: &MemoryKvStore) -> QuotaState {
        serde_json::from_str(&store.raw(keys::QUOTA).await.unwrap()).unwrap()
    }
}
