//! Conversation types: messages, the single resident session, and the
//! multi-chat collection.
//!
//! Ordering is append order only. Timestamps on `ChatThread` exist for the
//! session list, never for ordering messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Bot,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Author::User => write!(f, "user"),
            Author::Bot => write!(f, "bot"),
        }
    }
}

impl FromStr for Author {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Author::User),
            "bot" => Ok(Author::Bot),
            other => Err(format!("invalid author: '{other}'")),
        }
    }
}

/// A single transcript entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub author: Author,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            author: Author::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            author: Author::Bot,
            text: text.into(),
        }
    }
}

/// The one conversation resident on this device in single-chat mode.
///
/// `messages` is required on the wire: a stored blob without it is
/// structurally invalid and gets replaced by the default session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub messages: Vec<Message>,
}

impl Session {
    /// A session holding only the client-authored greeting.
    pub fn welcome(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::bot(greeting)],
        }
    }
}

/// One conversation in multi-chat mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatThread {
    /// Unique and stable for the life of the thread.
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every append; the session list sorts on it (descending).
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ChatThread {
    /// Text of the newest message, used as the list preview.
    pub fn last_text(&self) -> Option<&str> {
        self.messages.last().map(|m| m.text.as_str())
    }
}

/// Every multi-chat thread stored on this device, keyed by `ChatThread::id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCollection {
    #[serde(default)]
    pub chats: Vec<ChatThread>,
}

impl ChatCollection {
    pub fn get(&self, id: &Uuid) -> Option<&ChatThread> {
        self.chats.iter().find(|c| c.id == *id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut ChatThread> {
        self.chats.iter_mut().find(|c| c.id == *id)
    }
}
