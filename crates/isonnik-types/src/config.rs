//! Client configuration types.
//!
//! `ClientConfig` represents `config.toml` in the data directory. Every field
//! has a default, so an empty or missing file yields a working client.

use serde::{Deserialize, Serialize};

use crate::quota::DEFAULT_FREE_MESSAGES;

/// Greeting seeded into a fresh or cleared session.
pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Hi! I'm your AI dream interpreter. Tell me what you dreamed about \u{1f319}";

/// Which durable store backs the profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Sqlite,
}

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the chat backend, without a trailing slash.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout for every backend call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Free messages an unsubscribed device starts with.
    #[serde(default = "default_free_message_limit")]
    pub free_message_limit: u32,

    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,

    /// Storage scope, the equivalent of one browser profile.
    #[serde(default = "default_profile")]
    pub profile: String,

    #[serde(default)]
    pub storage: StorageKind,

    /// Reject a send while another one is waiting for its reply.
    #[serde(default = "default_true")]
    pub single_flight: bool,

    /// Ask `/api/chat/limits` before every send.
    #[serde(default)]
    pub limits_gate: bool,

    #[serde(default = "default_payment_amount")]
    pub payment_amount: u32,

    #[serde(default = "default_payment_description")]
    pub payment_description: String,

    #[serde(default)]
    pub speech: SpeechConfig,
}

/// External programs used for voice input and output.
///
/// Each command is an argv array. Absent commands mean the capability is
/// unsupported on this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default)]
    pub speak_command: Option<Vec<String>>,

    #[serde(default)]
    pub capture_command: Option<Vec<String>>,

    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            speak_command: None,
            capture_command: None,
            language: default_language(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_free_message_limit() -> u32 {
    DEFAULT_FREE_MESSAGES
}

fn default_welcome_message() -> String {
    DEFAULT_WELCOME_MESSAGE.to_string()
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

fn default_payment_amount() -> u32 {
    100
}

fn default_payment_description() -> String {
    "Monthly subscription".to_string()
}

fn default_language() -> String {
    "ru-RU".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            free_message_limit: default_free_message_limit(),
            welcome_message: default_welcome_message(),
            profile: default_profile(),
            storage: StorageKind::default(),
            single_flight: true,
            limits_gate: false,
            payment_amount: default_payment_amount(),
            payment_description: default_payment_description(),
            speech: SpeechConfig::default(),
        }
    }
}
