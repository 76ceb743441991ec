//! ChatBackend trait definition.
//!
//! The remote service is an opaque collaborator: authentication, payments
//! and reply generation all happen behind it. Implementations classify
//! every failure into a [`BackendError`] so that callers only ever match on
//! meaning (unauthorized, subscription required, ...), never on raw status
//! codes.

use isonnik_types::api::{
    ChatLimits, HistoryRecord, PaymentHandle, PaymentRequest, SendMessageResponse,
    SubscriptionStatus,
};
use isonnik_types::auth::{AuthToken, LoginRequest, LoginResponse, RegisterRequest};
use isonnik_types::error::BackendError;

/// Trait for the chat backend.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in isonnik-infra (e.g., `HttpChatBackend`).
pub trait ChatBackend: Send + Sync {
    /// `GET /api/chat/history`. A body that is not a JSON array is a
    /// `Deserialization` error.
    fn fetch_history(
        &self,
        token: &AuthToken,
    ) -> impl std::future::Future<Output = Result<Vec<HistoryRecord>, BackendError>> + Send;

    /// `POST /api/chat/message` with the raw user text.
    fn send_message(
        &self,
        token: &AuthToken,
        text: &str,
    ) -> impl std::future::Future<Output = Result<SendMessageResponse, BackendError>> + Send;

    /// `POST /api/chat/clear-context`.
    fn clear_context(
        &self,
        token: &AuthToken,
        keep_welcome: bool,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;

    /// `GET /api/payment/subscription/status`.
    fn subscription_status(
        &self,
        token: &AuthToken,
    ) -> impl std::future::Future<Output = Result<SubscriptionStatus, BackendError>> + Send;

    /// `GET /api/chat/limits` (no credential).
    fn chat_limits(
        &self,
    ) -> impl std::future::Future<Output = Result<ChatLimits, BackendError>> + Send;

    /// `POST /api/payment/create`.
    fn create_payment(
        &self,
        token: &AuthToken,
        request: &PaymentRequest,
    ) -> impl std::future::Future<Output = Result<PaymentHandle, BackendError>> + Send;

    /// `POST /api/payment/mock/success/{id}`.
    fn confirm_mock_payment(
        &self,
        token: &AuthToken,
        payment_id: &str,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;

    /// `POST /api/auth/login`.
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl std::future::Future<Output = Result<LoginResponse, BackendError>> + Send;

    /// `POST /api/auth/register`.
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;

    /// `POST /api/auth/logout`.
    fn logout(
        &self,
        token: &AuthToken,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;
}
