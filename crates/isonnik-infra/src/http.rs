//! HttpChatBackend -- concrete [`ChatBackend`] over the REST API.
//!
//! Every response is read as text first and classified by status before any
//! JSON parsing, so a non-OK answer with an unreadable body is still a
//! server error and not a malformed-response error.
//!
//! The bearer token is only exposed when the `Authorization` header is
//! built. It never appears in logs.

use std::time::Duration;

use isonnik_core::backend::ChatBackend;
use isonnik_types::api::{
    ChatLimits, ClearContextRequest, ErrorBody, HistoryRecord, PaymentHandle, PaymentRequest,
    SendMessageRequest, SendMessageResponse, SubscriptionStatus,
};
use isonnik_types::auth::{AuthToken, LoginRequest, LoginResponse, RegisterRequest};
use isonnik_types::error::BackendError;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

pub struct HttpChatBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send the request and return the body of a successful response.
    async fn execute(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Network(format!("failed to read response: {e}")))?;

        if status.is_success() {
            Ok(body)
        } else {
            debug!(status = status.as_u16(), "Backend returned an error status");
            Err(classify_failure(status, &body))
        }
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = self.execute(request).await?;
        parse(&body)
    }
}

/// Map a non-OK status and its body to a [`BackendError`].
///
/// 401 is always `Unauthorized`. 402, or any body flagged
/// `needSubscription`, is `SubscriptionRequired`. Everything else is a
/// `Status` carrying the body's `error` text when there is one.
fn classify_failure(status: StatusCode, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED => BackendError::Unauthorized,
        StatusCode::PAYMENT_REQUIRED => BackendError::SubscriptionRequired {
            message: parsed.error,
        },
        _ if parsed.need_subscription == Some(true) => BackendError::SubscriptionRequired {
            message: parsed.error,
        },
        _ => BackendError::Status {
            status: status.as_u16(),
            message: parsed
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Server error")
                        .to_string()
                }),
        },
    }
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body)
        .map_err(|e| BackendError::Deserialization(format!("failed to parse response: {e}")))
}

impl ChatBackend for HttpChatBackend {
    async fn fetch_history(&self, token: &AuthToken) -> Result<Vec<HistoryRecord>, BackendError> {
        let request = self
            .client
            .get(self.url("/api/chat/history"))
            .bearer_auth(token.expose());

        let value: serde_json::Value = self.execute_json(request).await?;
        if !value.is_array() {
            return Err(BackendError::Deserialization(
                "history response is not an array".to_string(),
            ));
        }
        serde_json::from_value(value)
            .map_err(|e| BackendError::Deserialization(format!("invalid history record: {e}")))
    }

    async fn send_message(
        &self,
        token: &AuthToken,
        text: &str,
    ) -> Result<SendMessageResponse, BackendError> {
        let request = self
            .client
            .post(self.url("/api/chat/message"))
            .bearer_auth(token.expose())
            .json(&SendMessageRequest { message: text });

        self.execute_json(request).await
    }

    async fn clear_context(&self, token: &AuthToken, keep_welcome: bool) -> Result<(), BackendError> {
        let request = self
            .client
            .post(self.url("/api/chat/clear-context"))
            .bearer_auth(token.expose())
            .json(&ClearContextRequest { keep_welcome });

        self.execute(request).await.map(|_| ())
    }

    async fn subscription_status(
        &self,
        token: &AuthToken,
    ) -> Result<SubscriptionStatus, BackendError> {
        let request = self
            .client
            .get(self.url("/api/payment/subscription/status"))
            .bearer_auth(token.expose());

        self.execute_json(request).await
    }

    async fn chat_limits(&self) -> Result<ChatLimits, BackendError> {
        let request = self.client.get(self.url("/api/chat/limits"));
        self.execute_json(request).await
    }

    async fn create_payment(
        &self,
        token: &AuthToken,
        request: &PaymentRequest,
    ) -> Result<PaymentHandle, BackendError> {
        let request = self
            .client
            .post(self.url("/api/payment/create"))
            .bearer_auth(token.expose())
            .json(request);

        self.execute_json(request).await
    }

    async fn confirm_mock_payment(
        &self,
        token: &AuthToken,
        payment_id: &str,
    ) -> Result<(), BackendError> {
        let request = self
            .client
            .post(self.url(&format!("/api/payment/mock/success/{payment_id}")))
            .bearer_auth(token.expose());

        self.execute(request).await.map(|_| ())
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, BackendError> {
        let request = self.client.post(self.url("/api/auth/login")).json(request);
        self.execute_json(request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), BackendError> {
        let request = self.client.post(self.url("/api/auth/register")).json(request);
        self.execute(request).await.map(|_| ())
    }

    async fn logout(&self, token: &AuthToken) -> Result<(), BackendError> {
        let request = self
            .client
            .post(self.url("/api/auth/logout"))
            .bearer_auth(token.expose());

        self.execute(request).await.map(|_| ())
    }
}
