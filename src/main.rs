//! staff-chat - admin/employee messaging client for the restaurant portal
//!
//! One-shot commands for scripting plus a terminal UI with live sync.

mod api;
mod commands;
mod config;
mod messaging;
mod models;
mod tui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tui::log_capture::LogBuffer;

#[derive(Parser)]
#[command(name = "staff-chat")]
#[command(about = "Admin and employee messaging for the restaurant portal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Set server, token and operator identity
    Configure {
        /// Portal base URL
        #[arg(long)]
        server: Option<String>,

        /// API bearer token
        #[arg(long)]
        token: Option<String>,

        /// Operator user id
        #[arg(long)]
        id: Option<String>,

        /// Operator display name
        #[arg(long)]
        name: Option<String>,

        /// Operator role: admin or employee
        #[arg(long)]
        role: Option<String>,
    },

    /// Show current configuration
    Status,

    /// List employee and group conversations, most recent first
    Conversations {
        /// Only conversations with unread messages
        #[arg(short, long)]
        unread: bool,

        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,

        /// Only group conversations
        #[arg(short, long)]
        groups: bool,
    },

    /// Read messages from a conversation
    Read {
        /// Conversation ID, or `employee:<id>` (from `conversations` output)
        conversation: String,

        /// Maximum number of messages to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Send a message
    Send {
        /// Conversation ID, or `employee:<id>` to message an employee
        #[arg(short, long)]
        to: String,

        /// Attach a file (repeatable)
        #[arg(short, long)]
        attach: Vec<PathBuf>,

        /// Message text
        message: Option<String>,
    },

    /// Save a message's attachments to disk
    Download {
        /// Conversation ID
        conversation: String,

        /// Message ID (from `read` output)
        message_id: String,

        /// Only the attachment at this position
        #[arg(short, long)]
        index: Option<usize>,

        /// Target directory (default: your downloads folder)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List chat groups
    Groups,

    /// Create a chat group
    CreateGroup {
        /// Group name
        name: String,

        /// Member user id (repeatable)
        #[arg(short, long = "member")]
        members: Vec<String>,
    },

    /// List employees that can be messaged
    Employees,

    /// Launch the terminal user interface
    Tui,
}

fn init_logging(verbose: bool, capture: Option<LogBuffer>) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    match capture {
        // The TUI owns the terminal; logs go to the debug pane instead.
        Some(buffer) => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(buffer),
            )
            .init(),
        None => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let capture = matches!(cli.command, Commands::Tui).then(LogBuffer::new);
    init_logging(cli.verbose, capture.clone());

    match cli.command {
        Commands::Configure {
            server,
            token,
            id,
            name,
            role,
        } => {
            commands::configure(server, token, id, name, role)?;
        }
        Commands::Status => {
            commands::status()?;
        }
        Commands::Conversations {
            unread,
            search,
            groups,
        } => {
            tracing::debug!("Fetching conversations...");
            commands::list_conversations(unread, search, groups).await?;
        }
        Commands::Read {
            conversation,
            limit,
        } => {
            commands::read_messages(&conversation, limit).await?;
        }
        Commands::Send {
            to,
            attach,
            message,
        } => {
            tracing::info!("Sending message...");
            commands::send_message(&to, attach, message).await?;
        }
        Commands::Download {
            conversation,
            message_id,
            index,
            out,
        } => {
            commands::download(&conversation, &message_id, index, out).await?;
        }
        Commands::Groups => {
            commands::list_groups().await?;
        }
        Commands::CreateGroup { name, members } => {
            commands::create_group(&name, members).await?;
        }
        Commands::Employees => {
            commands::list_employees().await?;
        }
        Commands::Tui => {
            tui::run(capture.unwrap_or_default()).await?;
        }
    }

    Ok(())
}
