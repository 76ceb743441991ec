//! In-memory fakes shared by the core tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use isonnik_types::api::{
    AiResponse, ChatLimits, HistoryRecord, PaymentHandle, PaymentRequest, SendMessageResponse,
    SubscriptionStatus,
};
use isonnik_types::auth::{AuthToken, LoginRequest, LoginResponse, RegisterRequest};
use isonnik_types::chat::Message;
use isonnik_types::error::{BackendError, RepositoryError};
use isonnik_types::quota::QuotaState;
use tokio::sync::Semaphore;

use crate::backend::ChatBackend;
use crate::render::{Notice, SessionSink};
use crate::storage::KvStore;
use crate::storage::memory::MemoryKvStore;

/// Scripted backend. Every call is recorded by endpoint name.
pub struct FakeBackend {
    history: Mutex<Result<Vec<HistoryRecord>, BackendError>>,
    replies: Mutex<VecDeque<Result<SendMessageResponse, BackendError>>>,
    subscription: Mutex<Result<SubscriptionStatus, BackendError>>,
    limits: Mutex<Result<ChatLimits, BackendError>>,
    payment: Mutex<Result<PaymentHandle, BackendError>>,
    login: Mutex<Result<LoginResponse, BackendError>>,
    register: Mutex<Result<(), BackendError>>,
    clear: Mutex<Result<(), BackendError>>,
    logout: Mutex<Result<(), BackendError>>,
    send_gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<String>>,
    sent: Mutex<Vec<String>>,
}

pub fn reply(text: &str) -> SendMessageResponse {
    SendMessageResponse {
        ai_response: Some(AiResponse {
            message: Some(text.to_string()),
        }),
        ..Default::default()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(Ok(Vec::new())),
            replies: Mutex::new(VecDeque::new()),
            subscription: Mutex::new(Ok(SubscriptionStatus::default())),
            limits: Mutex::new(Ok(ChatLimits {
                subscribed: false,
                remaining: 5,
            })),
            payment: Mutex::new(Ok(PaymentHandle::default())),
            login: Mutex::new(Ok(LoginResponse {
                token: Some("fresh-token".to_string()),
            })),
            register: Mutex::new(Ok(())),
            clear: Mutex::new(Ok(())),
            logout: Mutex::new(Ok(())),
            send_gate: None,
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_history(self, history: Result<Vec<HistoryRecord>, BackendError>) -> Self {
        *self.history.lock().unwrap() = history;
        self
    }

    /// Queue one send result. When the queue is empty, sends answer "ok".
    pub fn with_reply(self, reply: Result<SendMessageResponse, BackendError>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn with_subscription(self, status: Result<SubscriptionStatus, BackendError>) -> Self {
        *self.subscription.lock().unwrap() = status;
        self
    }

    pub fn with_limits(self, limits: Result<ChatLimits, BackendError>) -> Self {
        *self.limits.lock().unwrap() = limits;
        self
    }

    pub fn with_payment(self, handle: Result<PaymentHandle, BackendError>) -> Self {
        *self.payment.lock().unwrap() = handle;
        self
    }

    pub fn with_login(self, response: Result<LoginResponse, BackendError>) -> Self {
        *self.login.lock().unwrap() = response;
        self
    }

    pub fn with_clear(self, result: Result<(), BackendError>) -> Self {
        *self.clear.lock().unwrap() = result;
        self
    }

    pub fn with_logout(self, result: Result<(), BackendError>) -> Self {
        *self.logout.lock().unwrap() = result;
        self
    }

    /// Sends block until the semaphore hands out a permit.
    pub fn with_send_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.send_gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl ChatBackend for FakeBackend {
    async fn fetch_history(&self, _token: &AuthToken) -> Result<Vec<HistoryRecord>, BackendError> {
        self.record("fetch_history");
        self.history.lock().unwrap().clone()
    }

    async fn send_message(
        &self,
        _token: &AuthToken,
        text: &str,
    ) -> Result<SendMessageResponse, BackendError> {
        self.record("send_message");
        self.sent.lock().unwrap().push(text.to_string());
        if let Some(gate) = &self.send_gate {
            gate.acquire().await.unwrap().forget();
        }
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(reply("ok")))
    }

    async fn clear_context(&self, _token: &AuthToken, keep_welcome: bool) -> Result<(), BackendError> {
        self.record(format!("clear_context:{keep_welcome}"));
        self.clear.lock().unwrap().clone()
    }

    async fn subscription_status(&self, _token: &AuthToken) -> Result<SubscriptionStatus, BackendError> {
        self.record("subscription_status");
        self.subscription.lock().unwrap().clone()
    }

    async fn chat_limits(&self) -> Result<ChatLimits, BackendError> {
        self.record("chat_limits");
        self.limits.lock().unwrap().clone()
    }

    async fn create_payment(
        &self,
        _token: &AuthToken,
        _request: &PaymentRequest,
    ) -> Result<PaymentHandle, BackendError> {
        self.record("create_payment");
        self.payment.lock().unwrap().clone()
    }

    async fn confirm_mock_payment(&self, _token: &AuthToken, payment_id: &str) -> Result<(), BackendError> {
        self.record(format!("confirm_mock_payment:{payment_id}"));
        Ok(())
    }

    async fn login(&self, _request: &LoginRequest) -> Result<LoginResponse, BackendError> {
        self.record("login");
        self.login.lock().unwrap().clone()
    }

    async fn register(&self, _request: &RegisterRequest) -> Result<(), BackendError> {
        self.record("register");
        self.register.lock().unwrap().clone()
    }

    async fn logout(&self, _token: &AuthToken) -> Result<(), BackendError> {
        self.record("logout");
        self.logout.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Replaced(Vec<Message>),
    Appended(Message),
    Quota(String),
    Notice(Notice),
}

/// Sink that records everything pushed into it.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn appended(&self) -> Vec<Message> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Appended(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }
}

impl SessionSink for RecordingSink {
    fn on_session_replaced(&self, messages: &[Message]) {
        self.events.lock().unwrap().push(SinkEvent::Replaced(messages.to_vec()));
    }

    fn on_message_appended(&self, message: &Message) {
        self.events.lock().unwrap().push(SinkEvent::Appended(message.clone()));
    }

    fn on_quota_changed(&self, _quota: &QuotaState, indicator: &str) {
        self.events.lock().unwrap().push(SinkEvent::Quota(indicator.to_string()));
    }

    fn on_notice(&self, notice: &Notice) {
        self.events.lock().unwrap().push(SinkEvent::Notice(notice.clone()));
    }
}

/// Memory store whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryKvStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn raw(&self, key: &str) -> Option<String> {
        self.inner.raw(key).await
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(RepositoryError::Io("disk full".to_string()))
        } else {
            Ok(())
        }
    }
}

impl KvStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        self.check()?;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        self.check()?;
        self.inner.delete(key).await
    }
}
