use clap::Parser;
use std::path::PathBuf;

/// Terminal chat client for the relay endpoint
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The message to send
    #[arg(index = 1)] // Positional argument
    pub prompt: Option<String>,

    /// Enter interactive chat mode
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// File to attach to the first message
    #[arg(short, long)]
    pub attach: Option<PathBuf>,

    /// Relay endpoint URL
    #[arg(long)]
    pub relay_url: Option<String>,

    /// Path to the history file
    #[arg(long)]
    pub history_file: Option<PathBuf>,

    /// Clear the conversation history
    #[arg(long, default_value_t = false)]
    pub clear: bool,

    /// Print the conversation history
    #[arg(long, default_value_t = false)]
    pub history: bool,

    /// Write the conversation history to an HTML file
    #[arg(long)]
    pub export_html: Option<PathBuf>,

    /// Show replies at once instead of typing them out
    #[arg(long, default_value_t = false)]
    pub no_typing: bool,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// True when the invocation asks for something besides chatting.
    pub fn has_maintenance_action(&self) -> bool {
        self.clear || self.history || self.export_html.is_some()
    }
}
