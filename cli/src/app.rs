use anyhow::{Context, Result};
use chatbot_core::{Attachment, ChatError, ChatSession, InFlight};
use colored::*;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::output::{print_history, print_interactive_help, TerminalView};

/// Sends one message and waits for the rendered reply. Ctrl-C aborts it.
pub async fn run_single_query(
    session: &ChatSession,
    prompt: String,
    attachment: Option<Attachment>,
) -> Result<()> {
    info!("Running single query");
    let view = TerminalView::new();

    let submit = session.submit(&prompt, attachment, &view);
    tokio::pin!(submit);

    let result = tokio::select! {
        result = &mut submit => result,
        _ = tokio::signal::ctrl_c() => {
            session.cancel();
            submit.await
        }
    };

    match result {
        Ok(_) => Ok(()),
        Err(ChatError::Validation) => {
            eprintln!("{}", "Nothing to send: the message is empty.".yellow());
            Ok(())
        }
        // The view has already shown the message
        Err(e) => Err(anyhow::Error::new(e).context("Chat request failed")),
    }
}

fn print_prompt() {
    print!("{}: ", "You".green().bold());
    let _ = io::stdout().flush();
}

/// What one line of interactive input asks for
#[derive(Debug, PartialEq)]
pub enum Command<'a> {
    Empty,
    Exit,
    Help,
    Clear,
    History,
    Attach(&'a str),
    Message(&'a str),
}

pub fn parse_command(line: &str) -> Command<'_> {
    let input = line.trim();
    if input.is_empty() {
        return Command::Empty;
    }
    if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
        return Command::Exit;
    }

    match input.split_once(char::is_whitespace) {
        Some(("/attach", path)) => Command::Attach(path.trim()),
        _ => match input {
            "/help" => Command::Help,
            "/attach" => Command::Attach(""),
            "/clear" => Command::Clear,
            "/history" => Command::History,
            _ => Command::Message(input),
        },
    }
}

/// Runs an interactive chat session.
///
/// Input is read while a reply is still being produced; messages that arrive
/// then are dropped, never queued.
pub async fn run_interactive_chat(
    session: Arc<ChatSession>,
    mut pending_attachment: Option<Attachment>,
) -> Result<()> {
    println!("Starting interactive chat session.");
    print_interactive_help();
    if let Some(attachment) = &pending_attachment {
        println!("{} {}", "Attached".dimmed(), attachment.file_name.cyan());
    }

    let in_flight = InFlight::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_prompt();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read input")?,
            _ = tokio::signal::ctrl_c() => {
                if session.cancel() {
                    continue;
                }
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        match parse_command(&line) {
            Command::Empty => {
                if !in_flight.is_busy() {
                    print_prompt();
                }
            }
            Command::Exit => {
                session.cancel();
                println!("Exiting chat session.");
                break;
            }
            Command::Help => {
                print_interactive_help();
                print_prompt();
            }
            Command::Clear => {
                session.clear()?;
                pending_attachment = None;
                println!("{}", "Conversation cleared.".yellow());
                print_prompt();
            }
            Command::History => {
                print_history(&session.history());
                print_prompt();
            }
            Command::Attach(path) => {
                match Attachment::from_path(Path::new(path)) {
                    Ok(attachment) => {
                        println!("{} {}", "Attached".dimmed(), attachment.file_name.cyan());
                        pending_attachment = Some(attachment);
                    }
                    Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
                }
                print_prompt();
            }
            Command::Message(text) => {
                let Some(permit) = in_flight.try_acquire() else {
                    debug!("Dropped input while a reply is in flight");
                    println!("{}", "Still replying; message dropped.".dimmed());
                    continue;
                };

                let text = text.to_string();
                let attachment = pending_attachment.take();
                let session = session.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    let view = TerminalView::new();
                    // Errors are rendered by the view
                    let _ = session.submit(&text, attachment, &view).await;
                    drop(view);
                    println!();
                    print_prompt();
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("   "), Command::Empty);
        assert_eq!(parse_command("QUIT"), Command::Exit);
        assert_eq!(parse_command("/clear"), Command::Clear);
        assert_eq!(parse_command("/history"), Command::History);
        assert_eq!(parse_command("/attach  ./cat.png "), Command::Attach("./cat.png"));
        assert_eq!(parse_command("/attach"), Command::Attach(""));
        assert_eq!(parse_command("  hello there "), Command::Message("hello there"));
        assert_eq!(parse_command("/clearly not"), Command::Message("/clearly not"));
    }
}
