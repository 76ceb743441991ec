//! Pre-send limits check against `GET /api/chat/limits`.
//!
//! The gate fails open: a forbidden response, a network error or an
//! unreadable body all allow the send. Only a definite "unsubscribed and
//! nothing remaining" blocks it.

use isonnik_types::error::BackendError;
use tracing::debug;

use crate::backend::ChatBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitsVerdict {
    Allowed,
    PaymentRequired,
}

pub async fn check_limits<B: ChatBackend>(backend: &B) -> LimitsVerdict {
    match backend.chat_limits().await {
        Ok(limits) if limits.allows_sending() => LimitsVerdict::Allowed,
        Ok(limits) => {
            debug!(remaining = limits.remaining, "Chat limits exhausted");
            LimitsVerdict::PaymentRequired
        }
        Err(BackendError::Status { status: 403, .. }) => LimitsVerdict::Allowed,
        Err(e) => {
            debug!(error = %e, "Limits check failed, allowing send");
            LimitsVerdict::Allowed
        }
    }
}
