//! Local chat thread commands: new, list, open, delete.

use anyhow::{Result, anyhow};
use chrono::Local;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;
use isonnik_core::chat::{ChatSummary, DeleteOutcome};
use isonnik_core::render::NullSink;
use uuid::Uuid;

use crate::state::AppState;

use super::chat::loop_runner::{Conversation, run_chat_loop};

const PREVIEW_WIDTH: usize = 48;

pub(crate) fn short_id(id: &Uuid) -> String {
    id.to_string()[..8].to_string()
}

fn truncate(text: &str, width: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= width {
        return flat;
    }
    let cut: String = flat.chars().take(width.saturating_sub(3)).collect();
    format!("{cut}...")
}

fn summary_json(summary: &ChatSummary) -> serde_json::Value {
    serde_json::json!({
        "id": summary.id,
        "title": summary.title,
        "updated_at": summary.updated_at,
        "preview": summary.preview,
        "message_count": summary.message_count,
    })
}

async fn resolve(state: &AppState, id: &str) -> Result<Uuid> {
    state
        .chats
        .resolve(id)
        .await
        .ok_or_else(|| anyhow!("no chat matches '{id}' (use a full id or a unique prefix)"))
}

/// Create a thread and optionally start chatting in it.
pub async fn new_chat(state: &AppState, open: bool, json: bool) -> Result<()> {
    let thread = state.chats.create(&NullSink).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"id": thread.id, "title": thread.title, "created_at": thread.created_at})
        );
    } else {
        println!();
        println!(
            "  {} Created '{}' ({})",
            style("✓").green().bold(),
            style(&thread.title).cyan().bold(),
            style(short_id(&thread.id)).dim()
        );
        println!();
    }

    if open {
        run_chat_loop(state, Conversation::Thread(thread.id)).await?;
    }
    Ok(())
}

/// List threads, newest first.
pub async fn list_chats(state: &AppState, filter: Option<&str>, json: bool) -> Result<()> {
    let chats = state.chats.list(filter).await;

    if json {
        let rows: Vec<_> = chats.iter().map(summary_json).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if chats.is_empty() {
        println!();
        match filter {
            Some(f) => println!("  {} No chats match '{}'.", style("i").blue().bold(), f),
            None => println!(
                "  {} No chats yet. Start one with: {}",
                style("i").blue().bold(),
                style("isonnik chats new --open").yellow()
            ),
        }
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Last message").fg(Color::White),
        Cell::new("Msgs").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for chat in &chats {
        table.add_row(vec![
            Cell::new(short_id(&chat.id)).fg(Color::DarkGrey),
            Cell::new(&chat.title).fg(Color::Cyan),
            Cell::new(truncate(&chat.preview, PREVIEW_WIDTH)),
            Cell::new(chat.message_count),
            Cell::new(
                chat.updated_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            )
            .fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} chat{}",
        style(chats.len()).bold(),
        if chats.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

pub async fn open_chat(state: &AppState, id: &str) -> Result<()> {
    let id = resolve(state, id).await?;
    run_chat_loop(state, Conversation::Thread(id)).await
}

pub async fn delete_chat(state: &AppState, id: &str, force: bool, json: bool) -> Result<()> {
    let id = resolve(state, id).await?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete chat {} and all its messages?",
                style(short_id(&id)).red().bold()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let outcome = state.chats.delete(&id, &NullSink).await?;
    let deleted = matches!(outcome, DeleteOutcome::Removed { .. });

    if json {
        println!("{}", serde_json::json!({"id": id, "deleted": deleted}));
    } else if deleted {
        println!("  {} Chat {} deleted", style("✓").green().bold(), short_id(&id));
    } else {
        println!("  {} Chat {} was already gone", style("i").blue().bold(), short_id(&id));
    }
    Ok(())
}
