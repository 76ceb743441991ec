//! The renderer seam.
//!
//! Core components push state changes into a [`SessionSink`]; they never
//! draw anything themselves. The CLI implements it for the terminal, tests
//! implement it by recording events.

use isonnik_types::chat::Message;
use isonnik_types::quota::QuotaState;

/// Something the user must be told that is not itself a transcript message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// No credential, or the backend rejected it. Re-authenticate.
    NotAuthenticated,
    /// Free quota is used up. Open the payment prompt.
    PaymentRequired,
    /// The backend answered with a non-OK status.
    ServerError(String),
    /// No response at all, or an unreadable one.
    NetworkError(String),
    /// Multi-chat mode with no chat selected.
    NoActiveChat,
    /// A previous send is still waiting for its reply.
    Busy,
    ContextCleared,
    SubscriptionActivated,
}

/// Push-based sink the core renders into.
pub trait SessionSink: Send + Sync {
    /// The whole transcript was replaced (startup, clear, chat switch).
    fn on_session_replaced(&self, messages: &[Message]);

    fn on_message_appended(&self, message: &Message);

    fn on_quota_changed(&self, quota: &QuotaState, indicator: &str);

    fn on_notice(&self, notice: &Notice);
}

/// Sink that discards everything (non-interactive commands).
pub struct NullSink;

impl SessionSink for NullSink {
    fn on_session_replaced(&self, _messages: &[Message]) {}
    fn on_message_appended(&self, _message: &Message) {}
    fn on_quota_changed(&self, _quota: &QuotaState, _indicator: &str) {}
    fn on_notice(&self, _notice: &Notice) {}
}
