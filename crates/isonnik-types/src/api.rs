//! Backend wire format (JSON bodies, camelCase).
//!
//! The backend has changed field names over time. Where two names mean the
//! same thing, the adapter methods here pick one in a documented order
//! instead of letting callers probe fields ad hoc.

use serde::{Deserialize, Serialize};

/// Placeholder shown when an OK reply carries no text.
pub const EMPTY_REPLY_PLACEHOLDER: &str = "\u{2026}";

/// One record of `GET /api/chat/history`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: Option<String>,
    /// Current name of the "authored by the user" flag.
    #[serde(default, deserialize_with = "truthy_flag")]
    pub is_user_message: Option<bool>,
    /// Legacy name of the same flag.
    #[serde(default, deserialize_with = "truthy_flag")]
    pub user_message: Option<bool>,
}

impl HistoryRecord {
    /// Whether the user wrote this record.
    ///
    /// Checks `isUserMessage` first, then the legacy `userMessage`. Either
    /// flag being `true` means user; anything else means bot.
    pub fn is_user(&self) -> bool {
        self.is_user_message.unwrap_or(false) || self.user_message.unwrap_or(false)
    }

    pub fn text(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AiResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of a `POST /api/chat/message` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    #[serde(default)]
    pub ai_response: Option<AiResponse>,
    /// Reply field used by the multi-chat backend.
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub need_subscription: Option<bool>,
}

impl SendMessageResponse {
    /// Raw reply text: `aiResponse.message`, then `answer`, then the placeholder.
    pub fn reply_text(&self) -> &str {
        self.ai_response
            .as_ref()
            .and_then(|r| r.message.as_deref())
            .filter(|m| !m.is_empty())
            .or_else(|| self.answer.as_deref().filter(|a| !a.is_empty()))
            .unwrap_or(EMPTY_REPLY_PLACEHOLDER)
    }

    pub fn needs_subscription(&self) -> bool {
        self.need_subscription.unwrap_or(false)
    }
}

/// Error body returned with a non-OK status.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub need_subscription: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearContextRequest {
    pub keep_welcome: bool,
}

/// `GET /api/payment/subscription/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    /// `None` when the field is absent or not a boolean: no new information.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub has_active_subscription: Option<bool>,
}

/// `GET /api/chat/limits` (unauthenticated variant).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatLimits {
    #[serde(default)]
    pub subscribed: bool,
    #[serde(default)]
    pub remaining: i64,
}

impl ChatLimits {
    pub fn allows_sending(&self) -> bool {
        self.subscribed || self.remaining > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
    pub amount: u32,
    pub description: String,
}

/// Handle returned by `POST /api/payment/create`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHandle {
    #[serde(default, deserialize_with = "lenient_id")]
    pub mock_payment_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool())
}

/// Flags read by truthiness: `1`, `"yes"` and `[0]` are set, `0`, `""` and
/// `false` are not. `null` counts as absent.
fn truthy_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde_json::Value;

    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::Bool(b) => Some(b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan())),
        Value::String(s) => Some(!s.is_empty()),
        Value::Array(_) | Value::Object(_) => Some(true),
    })
}

/// Text that may arrive as a number or boolean. Anything else is absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde_json::Value;

    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
