//! Terminal rendering of the session.
//!
//! `TerminalSink` is the CLI's `SessionSink`: the core pushes transcript
//! changes, quota updates and notices into it and it draws them. Notices
//! are shown inline with the transcript but are never persisted.

use std::io::Write;
use std::sync::Mutex;

use console::style;
use isonnik_core::render::{Notice, SessionSink};
use isonnik_types::chat::{Author, Message};
use isonnik_types::quota::QuotaState;

/// Format one transcript message as a chat bubble.
pub fn format_message(message: &Message) -> String {
    let (label, body) = match message.author {
        Author::User => (style("You").green().bold(), style(&message.text)),
        Author::Bot => (style("Bot").cyan().bold(), style(&message.text).white()),
    };

    let mut lines = message.text.lines();
    let first = lines.next().unwrap_or("");
    if message.text.lines().count() <= 1 {
        return format!("  {label} {body}");
    }

    let mut out = format!("  {label} {first}");
    for line in lines {
        out.push_str(&format!("\n      {line}"));
    }
    out
}

pub fn format_notice(notice: &Notice) -> String {
    match notice {
        Notice::NotAuthenticated => format!(
            "  {} Not logged in. Run {} first.",
            style("!").red().bold(),
            style("isonnik login").yellow()
        ),
        Notice::PaymentRequired => format!(
            "  {} Your free messages are used up. Type {} to keep chatting.",
            style("$").yellow().bold(),
            style("/subscribe").cyan()
        ),
        Notice::ServerError(message) => format!(
            "  {} Server error: {}",
            style("!").red().bold(),
            message
        ),
        Notice::NetworkError(message) => format!(
            "  {} Connection problem ({}). Your message was kept, try again.",
            style("!").red().bold(),
            style(message).dim()
        ),
        Notice::NoActiveChat => format!(
            "  {} No chat selected. Create one with {}.",
            style("i").blue().bold(),
            style("isonnik chats new").yellow()
        ),
        Notice::Busy => format!(
            "  {} Still waiting for the previous reply.",
            style("...").dim()
        ),
        Notice::ContextCleared => format!(
            "  {} Context cleared. The bot starts fresh.",
            style("*").cyan().bold()
        ),
        Notice::SubscriptionActivated => format!(
            "  {} Subscription activated. Unlimited messages.",
            style("✓").green().bold()
        ),
    }
}

pub fn format_quota(quota: &QuotaState, indicator: &str) -> String {
    let label = if quota.has_subscription {
        style("Sent").dim()
    } else {
        style("Free messages").dim()
    };
    let value = if quota.is_exhausted() {
        style(indicator).red().bold()
    } else {
        style(indicator).bold()
    };
    format!("  {} {label}: {value}", style("|").dim())
}

/// `SessionSink` that writes to the terminal.
///
/// In the interactive loop the writer is the readline `SharedWriter`, so
/// output never tears the prompt.
pub struct TerminalSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl TerminalSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn line(&self, text: &str) {
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{text}");
            let _ = out.flush();
        }
    }
}

impl SessionSink for TerminalSink {
    fn on_session_replaced(&self, messages: &[Message]) {
        self.line("");
        if messages.is_empty() {
            self.line(&format!("  {}", style("No messages yet").dim()));
        }
        for message in messages {
            self.line(&format_message(message));
        }
        self.line("");
    }

    fn on_message_appended(&self, message: &Message) {
        self.line(&format_message(message));
    }

    fn on_quota_changed(&self, quota: &QuotaState, indicator: &str) {
        self.line(&format_quota(quota, indicator));
    }

    fn on_notice(&self, notice: &Notice) {
        self.line(&format_notice(notice));
    }
}
