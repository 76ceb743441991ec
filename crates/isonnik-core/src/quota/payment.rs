//! Subscription purchase: create a payment, confirm it, re-read the quota.

use std::sync::Arc;

use isonnik_types::api::PaymentRequest;
use isonnik_types::error::{BackendError, ClientError};
use isonnik_types::quota::QuotaState;
use tracing::info;

use super::tracker::QuotaTracker;
use crate::backend::ChatBackend;
use crate::render::{Notice, SessionSink};
use crate::storage::KvStore;
use crate::storage::credentials::CredentialStore;

/// How a subscribe attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// A mock payment was confirmed; the refreshed quota is attached.
    Activated(QuotaState),
    /// A real provider wants the user to finish paying in a browser.
    Redirect(String),
}

pub struct SubscriptionService<S, B> {
    backend: Arc<B>,
    credentials: CredentialStore<S>,
    quota: QuotaTracker<S>,
    request: PaymentRequest,
}

impl<S: KvStore, B: ChatBackend> SubscriptionService<S, B> {
    pub fn new(
        backend: Arc<B>,
        credentials: CredentialStore<S>,
        quota: QuotaTracker<S>,
        amount: u32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            credentials,
            quota,
            request: PaymentRequest {
                amount,
                description: description.into(),
            },
        }
    }

    /// Run the payment flow for one monthly subscription.
    pub async fn subscribe(&self, sink: &dyn SessionSink) -> Result<PaymentOutcome, ClientError> {
        let token = self
            .credentials
            .load()
            .await?
            .ok_or(ClientError::NotAuthenticated)?;

        let handle = self.backend.create_payment(&token, &self.request).await?;

        if let Some(payment_id) = handle.mock_payment_id {
            self.backend.confirm_mock_payment(&token, &payment_id).await?;
            info!(payment_id = %payment_id, "Mock payment confirmed");

            self.quota
                .refresh_from_backend(self.backend.as_ref(), Some(&token), sink)
                .await;
            let state = self.quota.render_indicator(sink).await?;
            sink.on_notice(&Notice::SubscriptionActivated);
            return Ok(PaymentOutcome::Activated(state));
        }

        match handle.url {
            Some(url) => {
                info!("Payment requires a browser redirect");
                Ok(PaymentOutcome::Redirect(url))
            }
            None => Err(BackendError::Deserialization(
                "payment handle has neither a payment id nor a url".to_string(),
            )
            .into()),
        }
    }
}
