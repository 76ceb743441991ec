//! Main chat loop.
//!
//! Two conversations can be open: the synced one, reconciled against the
//! account's remote history at startup, or a local thread from the chat
//! list. Everything the core reports is drawn by a `TerminalSink` writing
//! above the prompt.

use std::time::Duration;

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use isonnik_core::chat::{DeleteOutcome, DispatchOutcome, SessionSource, Transcript};
use isonnik_core::quota::PaymentOutcome;
use isonnik_core::render::{Notice, SessionSink};
use isonnik_core::speech::{SpeechEngine, speak_message};
use isonnik_types::chat::{Author, Message};
use isonnik_types::error::{BackendError, ClientError, SpeechError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cli::chats::short_id;
use crate::state::AppState;

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::{TerminalSink, format_message};

/// Which conversation the loop writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversation {
    Synced,
    Thread(Uuid),
}

enum Flow {
    Continue,
    Send(String),
    Exit,
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("interpreting...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Run the interactive loop until the user exits.
pub async fn run_chat_loop(state: &AppState, conversation: Conversation) -> anyhow::Result<()> {
    let label = match conversation {
        Conversation::Synced => "Synced with your account".to_string(),
        Conversation::Thread(id) => state
            .chats
            .list(None)
            .await
            .into_iter()
            .find(|c| c.id == id)
            .map(|c| format!("{} ({})", c.title, short_id(&c.id)))
            .with_context(|| format!("chat {id} not found"))?,
    };
    print_welcome_banner(
        &label,
        &state.config.profile,
        &state.store.describe(),
        &state.config.api_base_url,
    );

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut input, writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;
    let sink = TerminalSink::new(Box::new(writer));

    match conversation {
        Conversation::Synced => match state.start_session(&sink).await {
            Ok(reconciled) => {
                if reconciled.source == SessionSource::LocalCache {
                    sink.line(&format!(
                        "  {}",
                        style("Offline: showing the conversation saved on this device.").dim()
                    ));
                }
            }
            Err(ClientError::NotAuthenticated) => {
                sink.on_notice(&Notice::NotAuthenticated);
                input.flush();
                return Ok(());
            }
            Err(e) => {
                input.flush();
                return Err(e).context("failed to start the session");
            }
        },
        Conversation::Thread(id) => {
            if state.chats.select(&id, &sink).await.is_none() {
                input.flush();
                anyhow::bail!("chat {id} not found");
            }
            state.quota.render_indicator(&sink).await?;
        }
    }

    let result = chat_turns(state, conversation, &mut input, &sink).await;

    let _ = state.speech.cancel().await;
    input.flush();
    println!("\n  {}", style("Session ended.").dim());
    result
}

async fn chat_turns(
    state: &AppState,
    conversation: Conversation,
    input: &mut ChatInput,
    sink: &TerminalSink,
) -> anyhow::Result<()> {
    loop {
        let text = match input.read_line().await {
            InputEvent::Eof => return Ok(()),
            InputEvent::Interrupted => {
                let _ = state.speech.cancel().await;
                sink.line(&format!(
                    "  {}",
                    style("Press Ctrl+D to exit, or keep chatting.").dim()
                ));
                continue;
            }
            InputEvent::Message(text) if text.is_empty() => continue,
            InputEvent::Message(text) => text,
        };

        let text = match commands::parse(&text) {
            None => text,
            Some(command) => match run_command(state, conversation, command, input, sink).await? {
                Flow::Continue => continue,
                Flow::Exit => return Ok(()),
                Flow::Send(text) => text,
            },
        };

        send(state, conversation, &text, sink).await?;
    }
}

async fn send(
    state: &AppState,
    conversation: Conversation,
    text: &str,
    sink: &TerminalSink,
) -> anyhow::Result<()> {
    let spinner = thinking_spinner();
    let outcome = match conversation {
        Conversation::Synced => state.dispatcher.send(text, sink).await,
        Conversation::Thread(_) => state.thread_dispatcher.send(text, sink).await,
    };
    spinner.finish_and_clear();

    let outcome = outcome.context("failed to save the conversation")?;
    debug!(replied = matches!(outcome, DispatchOutcome::Replied(_)), "Send finished");
    Ok(())
}

async fn transcript(state: &AppState, conversation: Conversation) -> Option<Vec<Message>> {
    match conversation {
        Conversation::Synced => state.chat.messages().await,
        Conversation::Thread(_) => state.chats.messages().await,
    }
}

async fn run_command(
    state: &AppState,
    conversation: Conversation,
    command: ChatCommand,
    input: &mut ChatInput,
    sink: &TerminalSink,
) -> anyhow::Result<Flow> {
    match command {
        ChatCommand::Help => {
            for line in commands::help_lines() {
                sink.line(&line);
            }
        }

        ChatCommand::ClearScreen => input.clear(),

        ChatCommand::Exit => return Ok(Flow::Exit),

        ChatCommand::ClearContext => {
            if let Conversation::Thread(_) = conversation {
                sink.line(&format!(
                    "  {} Context clearing applies to the synced chat only.",
                    style("i").blue().bold()
                ));
                return Ok(Flow::Continue);
            }
            match state.context.clear_context(sink).await {
                Ok(_) => info!("Context cleared"),
                Err(ClientError::NotAuthenticated) => sink.on_notice(&Notice::NotAuthenticated),
                Err(ClientError::Backend(BackendError::Network(e))) => {
                    sink.on_notice(&Notice::NetworkError(e));
                }
                Err(e) => return Err(e).context("failed to clear context"),
            }
        }

        ChatCommand::Quota => {
            state.quota.render_indicator(sink).await?;
        }

        ChatCommand::RefreshQuota => {
            let token = state.credentials.load().await?;
            let refreshed = state
                .quota
                .refresh_from_backend(state.backend.as_ref(), token.as_ref(), sink)
                .await;
            if refreshed.is_none() {
                sink.line(&format!(
                    "  {}",
                    style("Could not reach the server, showing the local count.").dim()
                ));
                state.quota.render_indicator(sink).await?;
            }
        }

        ChatCommand::Subscribe => {
            let spinner = thinking_spinner();
            spinner.set_message("processing payment...");
            let outcome = state.subscriptions.subscribe(sink).await;
            spinner.finish_and_clear();
            match outcome {
                Ok(PaymentOutcome::Activated(_)) => {}
                Ok(PaymentOutcome::Redirect(url)) => sink.line(&format!(
                    "  {} Finish the payment at {}",
                    style("$").yellow().bold(),
                    style(url).cyan().underlined()
                )),
                Err(ClientError::NotAuthenticated) => sink.on_notice(&Notice::NotAuthenticated),
                Err(e) => sink.line(&format!(
                    "  {} Payment failed: {e}",
                    style("!").red().bold()
                )),
            }
        }

        ChatCommand::Speak => {
            let last_reply = transcript(state, conversation)
                .await
                .and_then(|messages| messages.into_iter().rev().find(|m| m.author == Author::Bot));
            let Some(reply) = last_reply else {
                sink.line(&format!("  {}", style("Nothing to read yet.").dim()));
                return Ok(Flow::Continue);
            };
            if let Err(e) = speak_message(&state.speech, &reply).await {
                sink.line(&speech_error_line(&e));
            }
        }

        ChatCommand::Stop => {
            if let Err(e) = state.speech.cancel().await {
                sink.line(&speech_error_line(&e));
            }
        }

        ChatCommand::Voice => {
            sink.line(&format!("  {}", style("Listening...").dim()));
            match state.speech.capture().await {
                Ok(Some(text)) => return Ok(Flow::Send(text)),
                Ok(None) => sink.line(&format!("  {}", style("Didn't catch that.").dim())),
                Err(e) => sink.line(&speech_error_line(&e)),
            }
        }

        ChatCommand::History => match transcript(state, conversation).await {
            Some(messages) => {
                sink.line("");
                for message in &messages {
                    sink.line(&format_message(message));
                }
                sink.line("");
            }
            None => sink.on_notice(&Notice::NoActiveChat),
        },

        ChatCommand::NewChat | ChatCommand::OpenChat(_) | ChatCommand::DeleteChat
            if conversation == Conversation::Synced =>
        {
            sink.line(&format!(
                "  {} The synced chat is a single conversation. Use {} for separate chats.",
                style("i").blue().bold(),
                style("isonnik chats").yellow()
            ));
        }

        ChatCommand::NewChat => {
            let thread = state.chats.create(sink).await?;
            sink.line(&format!(
                "  {} Started {} ({})",
                style("+").green().bold(),
                style(&thread.title).bold(),
                style(short_id(&thread.id)).dim()
            ));
        }

        ChatCommand::OpenChat(None) => {
            for chat in state.chats.list(None).await {
                sink.line(&format!(
                    "  {} {}",
                    style(short_id(&chat.id)).cyan(),
                    chat.title
                ));
            }
            sink.line(&format!("  {}", style("Switch with /open <id>").dim()));
        }

        ChatCommand::OpenChat(Some(prefix)) => {
            let selected = match state.chats.resolve(&prefix).await {
                Some(id) => state.chats.select(&id, sink).await,
                None => None,
            };
            if selected.is_none() {
                sink.line(&format!(
                    "  {} No chat matches {}",
                    style("?").yellow().bold(),
                    style(prefix).dim()
                ));
            }
        }

        ChatCommand::DeleteChat => {
            let Some(id) = state.chats.active_id().await else {
                sink.on_notice(&Notice::NoActiveChat);
                return Ok(Flow::Continue);
            };
            let question = format!("Delete chat {} and all its messages?", short_id(&id));
            if !input.confirm(&question).await {
                sink.line(&format!("  {}", style("Kept.").dim()));
                return Ok(Flow::Continue);
            }
            if let DeleteOutcome::Removed { .. } = state.chats.delete(&id, sink).await? {
                info!(chat_id = %id, "Chat deleted from the loop");
                sink.line(&format!(
                    "  {} Chat deleted. Use /new or /open <id> to keep going.",
                    style("✓").green().bold()
                ));
            }
        }

        ChatCommand::Unknown(name) => sink.line(&format!(
            "  {} Unknown command: {}. Type /help for available commands.",
            style("?").yellow().bold(),
            style(name).dim()
        )),
    }

    Ok(Flow::Continue)
}

fn speech_error_line(error: &SpeechError) -> String {
    match error {
        SpeechError::Unsupported => format!(
            "  {} Speech is not configured. Set {} in config.toml.",
            style("i").blue().bold(),
            style("[speech]").yellow()
        ),
        SpeechError::Failed(e) => format!("  {} Speech failed: {e}", style("!").red().bold()),
    }
}
