//! Slash commands available inside the chat loop.

use console::style;

#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    Help,
    /// Ask the backend to forget the conversation context.
    ClearContext,
    /// Clear the terminal screen.
    ClearScreen,
    Quota,
    RefreshQuota,
    Subscribe,
    /// Read the last bot reply aloud.
    Speak,
    /// Interrupt speech.
    Stop,
    /// Capture one utterance and send it.
    Voice,
    History,
    /// Start a new chat thread and switch to it.
    NewChat,
    /// Switch to another chat thread by id or unique prefix.
    OpenChat(Option<String>),
    /// Delete the open chat thread.
    DeleteChat,
    Exit,
    Unknown(String),
}

/// Parse user input as a slash command. `None` for ordinary messages.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut words = trimmed.split_whitespace();
    let cmd = words.next().unwrap_or(trimmed).to_lowercase();
    let argument = words.next().map(str::to_string);

    Some(match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/clear" => ChatCommand::ClearContext,
        "/cls" => ChatCommand::ClearScreen,
        "/quota" => ChatCommand::Quota,
        "/refresh" => ChatCommand::RefreshQuota,
        "/subscribe" | "/pay" => ChatCommand::Subscribe,
        "/speak" | "/say" => ChatCommand::Speak,
        "/stop" => ChatCommand::Stop,
        "/voice" | "/mic" => ChatCommand::Voice,
        "/history" => ChatCommand::History,
        "/new" => ChatCommand::NewChat,
        "/open" | "/switch" => ChatCommand::OpenChat(argument),
        "/delete" | "/rm" => ChatCommand::DeleteChat,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        other => ChatCommand::Unknown(other.to_string()),
    })
}

/// Help text, one line per entry, ready for the chat writer.
pub fn help_lines() -> Vec<String> {
    let rows = [
        ("/help", "Show this help message"),
        ("/clear", "Clear the conversation context"),
        ("/cls", "Clear the screen"),
        ("/quota", "Show remaining messages"),
        ("/refresh", "Re-check subscription status"),
        ("/subscribe", "Buy a monthly subscription"),
        ("/speak", "Read the last reply aloud"),
        ("/stop", "Stop reading aloud"),
        ("/voice", "Dictate a message"),
        ("/history", "Show the conversation so far"),
        ("/new", "Start a new chat (chat list only)"),
        ("/open <id>", "Switch to another chat (chat list only)"),
        ("/delete", "Delete this chat (chat list only)"),
        ("/exit", "Leave the chat"),
    ];

    let mut lines = vec![String::new(), format!("  {}", style("Available commands:").bold())];
    lines.push(String::new());
    for (command, description) in rows {
        lines.push(format!("  {} {description}", style(format!("{command:<12}")).cyan()));
    }
    lines.push(String::new());
    lines.push(format!("  {}", style("Ctrl+C stops speech, Ctrl+D exits").dim()));
    lines
}
