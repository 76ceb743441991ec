//! CLI command definitions for the `isonnik` binary.

pub mod account;
pub mod chat;
pub mod chats;
pub mod quota;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Talk to the dream interpreter from your terminal.
#[derive(Parser)]
#[command(name = "isonnik", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Backend base URL, overriding config.toml.
    #[arg(long, env = "ISONNIK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Storage profile, overriding config.toml.
    #[arg(long, env = "ISONNIK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Keep all state in memory for this run; nothing is written to disk.
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the synced chat (history is loaded from your account).
    Chat,

    /// Manage local chat threads.
    Chats {
        #[command(subcommand)]
        action: ChatsCommand,
    },

    /// Log in and store the session token on this device.
    Login {
        /// Account email. Prompted when omitted.
        #[arg(long)]
        email: Option<String>,
    },

    /// Create an account.
    Register {
        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Birth date as YYYY-MM-DD.
        #[arg(long)]
        birth_date: Option<String>,
    },

    /// Log out and wipe this profile's local state.
    Logout,

    /// Show remaining free messages or the subscription counter.
    Quota {
        /// Ask the server for the current subscription status first.
        #[arg(long)]
        refresh: bool,
    },

    /// Buy a monthly subscription.
    Subscribe,

    /// Ask the server to forget the conversation context.
    Clear,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ChatsCommand {
    /// Create a new thread.
    New {
        /// Start chatting in it right away.
        #[arg(long)]
        open: bool,
    },

    /// List threads, newest first.
    #[command(alias = "ls")]
    List {
        /// Only show threads whose title or last message contains this text.
        #[arg(long, short)]
        filter: Option<String>,
    },

    /// Chat in an existing thread.
    Open {
        /// Thread id or a unique prefix of it.
        id: String,
    },

    /// Delete a thread.
    #[command(alias = "rm")]
    Delete {
        /// Thread id or a unique prefix of it.
        id: String,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}
