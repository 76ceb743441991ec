//! Local optimistic view of free usage and subscription status.

use serde::{Deserialize, Serialize};

/// Free messages granted to an unsubscribed device.
pub const DEFAULT_FREE_MESSAGES: u32 = 5;

/// Quota snapshot persisted next to the session.
///
/// Invariant: `has_subscription` implies `free_left == 0`. Every mutator
/// below preserves it; `normalized` restores it on data read from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    pub free_left: u32,
    pub total_sent: u32,
    pub has_subscription: bool,
}

impl Default for QuotaState {
    fn default() -> Self {
        Self::with_free_messages(DEFAULT_FREE_MESSAGES)
    }
}

impl QuotaState {
    pub fn with_free_messages(free_left: u32) -> Self {
        Self {
            free_left,
            total_sent: 0,
            has_subscription: false,
        }
    }

    /// Account for one successfully answered user message.
    ///
    /// Subscribed: `total_sent` grows and `free_left` stays 0.
    /// Unsubscribed: `free_left` shrinks by one, floored at 0.
    pub fn record_reply(&mut self) {
        if self.has_subscription {
            self.free_left = 0;
            self.total_sent = self.total_sent.saturating_add(1);
        } else {
            self.free_left = self.free_left.saturating_sub(1);
        }
    }

    /// Apply the backend's answer to "is the subscription active?".
    pub fn apply_subscription(&mut self, active: bool) {
        self.has_subscription = active;
        if active {
            self.free_left = 0;
        }
    }

    /// The backend refused a message for lack of quota.
    pub fn exhaust(&mut self) {
        self.free_left = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        !self.has_subscription && self.free_left == 0
    }

    pub fn normalized(mut self) -> Self {
        if self.has_subscription {
            self.free_left = 0;
        }
        self
    }

    /// Indicator text: `"{total_sent} / ∞"` when subscribed, else `"{free_left} / {limit}"`.
    pub fn indicator(&self, limit: u32) -> String {
        if self.has_subscription {
            format!("{} / \u{221e}", self.total_sent)
        } else {
            format!("{} / {}", self.free_left, limit)
        }
    }
}
