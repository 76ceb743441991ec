//! isonnik CLI entry point.
//!
//! Binary name: `isonnik`
//!
//! Parses arguments, sets up tracing, wires the profile's services and
//! dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::chat::loop_runner::{Conversation, run_chat_loop};
use cli::{ChatsCommand, Cli, Commands};
use state::{AppState, StateOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,isonnik=debug",
        _ => "trace",
    };
    isonnik_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "isonnik", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(StateOptions {
        api_url: cli.api_url.clone(),
        profile: cli.profile.clone(),
        ephemeral: cli.ephemeral,
    })
    .await?;

    let result = run(&state, cli).await;
    isonnik_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(state: &AppState, cli: Cli) -> anyhow::Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Chat => run_chat_loop(state, Conversation::Synced).await,

        Commands::Chats { action } => match action {
            ChatsCommand::New { open } => cli::chats::new_chat(state, open, json).await,
            ChatsCommand::List { filter } => {
                cli::chats::list_chats(state, filter.as_deref(), json).await
            }
            ChatsCommand::Open { id } => cli::chats::open_chat(state, &id).await,
            ChatsCommand::Delete { id, force } => {
                cli::chats::delete_chat(state, &id, force, json).await
            }
        },

        Commands::Login { email } => cli::account::login(state, email, json).await,

        Commands::Register {
            username,
            email,
            birth_date,
        } => cli::account::register(state, username, email, birth_date, json).await,

        Commands::Logout => cli::account::logout(state, json).await,

        Commands::Quota { refresh } => cli::quota::show_quota(state, refresh, json).await,

        Commands::Subscribe => cli::quota::subscribe(state, json).await,

        Commands::Clear => cli::quota::clear_context(state, json).await,

        Commands::Completions { .. } => Ok(()),
    }
}
