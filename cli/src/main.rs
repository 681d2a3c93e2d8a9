use anyhow::{Context, Result};
use chatbot_core::{Attachment, ChatSession, HistoryStore, RelayClient};
use clap::Parser;
use colored::*;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

mod app;
mod cli;
mod config;
mod logging;
mod output;

use crate::cli::Args;
use crate::config::resolve_config;
use crate::logging::init_logging;
use crate::output::{print_history, print_usage_instructions, render_history_html};

/// Main function - runs maintenance actions, then chats through the relay
#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env before reading CHATBOT_* variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = resolve_config(&args)?;
    init_logging(config.log_level.as_deref());
    debug!(?config, "Resolved configuration");

    let store = HistoryStore::new(config.history_path()?);

    if args.clear {
        store.clear().context("Failed to clear history")?;
        println!("{}", "Conversation cleared.".yellow());
    }

    if args.history {
        print_history(&store.load());
    }

    if let Some(path) = &args.export_html {
        std::fs::write(path, render_history_html(&store.load()))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Exported conversation to {}", path.display().to_string().cyan());
    }

    let attachment = args
        .attach
        .as_deref()
        .map(Attachment::from_path)
        .transpose()?;

    let interval = if config.typing() {
        Duration::from_millis(config.reveal_interval_ms())
    } else {
        Duration::ZERO
    };
    let transport = Arc::new(RelayClient::new(config.relay_url()));
    let session = Arc::new(ChatSession::new(store, transport, interval));

    if args.interactive {
        app::run_interactive_chat(session, attachment).await?;
    } else if let Some(prompt) = args.prompt.as_deref() {
        if let Err(e) = app::run_single_query(&session, prompt.to_string(), attachment).await {
            // Error is already printed by the view
            error!("{:#}", e);
            return Ok(ExitCode::FAILURE);
        }
    } else if !args.has_maintenance_action() {
        print_usage_instructions();
    }

    Ok(ExitCode::SUCCESS)
}
