use chatbot_core::markdown::{escape_html, to_html, to_terminal};
use chatbot_core::{Attachment, ChatView, PipelineState, Role, Turn};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Lines of the partial reply kept visible under the spinner while typing
const REVEAL_TAIL_LINES: usize = 6;

/// Terminal rendering of one chat cycle: a spinner placeholder that types the
/// reply out, replaced by the rendered markdown when the cycle finishes.
pub struct TerminalView {
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn clear_bar(&self) {
        if let Some(bar) = self.lock().take() {
            bar.finish_and_clear();
        }
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TerminalView {
    fn drop(&mut self) {
        self.clear_bar();
    }
}

impl ChatView for TerminalView {
    fn show_placeholder(&self) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("thinking…");
        spinner.enable_steady_tick(Duration::from_millis(120));

        if let Some(previous) = self.lock().replace(spinner) {
            previous.finish_and_clear();
        }
    }

    fn reveal(&self, _token: &str, revealed: &str) {
        if let Some(bar) = self.lock().as_ref() {
            bar.set_message(tail_lines(revealed, REVEAL_TAIL_LINES));
        }
    }

    fn finish(&self, text: &str) {
        self.clear_bar();
        print_model_reply(text);
    }

    fn show_error(&self, message: &str) {
        self.clear_bar();
        eprintln!("{} {}", "Error:".red().bold(), message.red());
    }

    fn set_status(&self, state: PipelineState) {
        debug!(%state, "Status");
    }
}

/// The last `count` lines of `text`.
pub fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}

/// Print a model reply with markdown rendering
pub fn print_model_reply(text: &str) {
    println!("{}: {}", "Assistant".blue().bold(), to_terminal(text));
    let _ = io::stdout().flush();
}

fn attachment_label(attachment: &Attachment) -> String {
    format!("[{} · {}]", attachment.file_name, attachment.mime_type)
}

/// Print the whole conversation log
pub fn print_history(turns: &[Turn]) {
    if turns.is_empty() {
        println!("{}", "No conversation history.".dimmed());
        return;
    }

    for turn in turns {
        match turn.role {
            Role::User => {
                println!("{}: {}", "You".green().bold(), turn.text);
                if let Some(attachment) = &turn.attachment {
                    println!("     {}", attachment_label(attachment).dimmed());
                }
            }
            Role::Model => print_model_reply(&turn.text),
        }
        println!();
    }
}

/// Standalone HTML page for the conversation log. User text is escaped,
/// model text goes through the markdown renderer.
pub fn render_history_html(turns: &[Turn]) -> String {
    let mut body = String::new();

    for turn in turns {
        match turn.role {
            Role::User => {
                body.push_str("<div class=\"msg user\">");
                body.push_str(&escape_html(&turn.text));
                if let Some(attachment) = &turn.attachment {
                    if attachment.is_image {
                        body.push_str(&format!(
                            "<img class=\"attachment\" src=\"{}\" alt=\"{}\">",
                            escape_html(&attachment.data_url),
                            escape_html(&attachment.file_name)
                        ));
                    } else {
                        body.push_str(&format!(
                            "<div class=\"attachment\">{}</div>",
                            escape_html(&attachment_label(attachment))
                        ));
                    }
                }
                body.push_str("</div>\n");
            }
            Role::Model => {
                body.push_str("<div class=\"msg bot\">");
                body.push_str(&to_html(&turn.text));
                body.push_str("</div>\n");
            }
        }
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Conversation</title>\n\
         <style>\n\
         body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }}\n\
         .msg {{ padding: 0.5rem 1rem; margin: 0.5rem 0; border-radius: 0.5rem; }}\n\
         .user {{ background: #e8f0fe; white-space: pre-wrap; }}\n\
         .bot {{ background: #f4f4f4; }}\n\
         .attachment {{ display: block; max-width: 16rem; margin-top: 0.5rem; color: #555; }}\n\
         </style>\n</head>\n<body>\n{}</body>\n</html>\n",
        body
    )
}

/// Show usage instructions when no prompt or action is provided
pub fn print_usage_instructions() {
    println!("{}", "Usage:".yellow().bold());
    println!("  {}", "chatbot \"your message\"".green().bold());
    println!("    Send a single message through the relay");
    println!();
    println!("  {}", "chatbot -i".green().bold());
    println!("    Start an interactive chat session");
    println!();
    println!("{}", "Options:".cyan());
    println!("  -a, --attach <FILE>     Attach a file to the message");
    println!("  --history               Print the conversation history");
    println!("  --clear                 Clear the conversation history");
    println!("  --export-html <FILE>    Write the history as an HTML page");
    println!("  --relay-url <URL>       Relay endpoint to use");
    println!("  --help                  Show this help message");
    println!();
}

/// Commands understood in interactive mode
pub fn print_interactive_help() {
    println!("Type a message and press Enter. Ctrl-C cancels a reply in progress.");
    println!("  {}   attach a file to the next message", "/attach <path>".cyan());
    println!("  {}           print the conversation", "/history".cyan());
    println!("  {}             clear the conversation", "/clear".cyan());
    println!("  {}        end the session", "exit | quit".cyan());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail_lines("a\nb\nc\nd", 2), "c\nd");
        assert_eq!(tail_lines("only", 6), "only");
        assert_eq!(tail_lines("", 3), "");
    }

    #[test]
    fn html_export_escapes_user_text_and_renders_replies() {
        let turns = vec![
            Turn::user(
                "<b>bold?</b>".to_string(),
                Some(Attachment {
                    file_name: "pic.png".into(),
                    data_url: "data:image/png;base64,iVBORw==".into(),
                    mime_type: "image/png".into(),
                    is_image: true,
                }),
            ),
            Turn::model("**yes**".to_string()),
        ];

        let html = render_history_html(&turns);

        assert!(html.contains("&lt;b&gt;bold?&lt;/b&gt;"));
        assert!(html.contains("src=\"data:image/png;base64,iVBORw==\""));
        assert!(html.contains("<strong>yes</strong>"));
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn html_export_labels_non_image_attachments() {
        let turns = vec![Turn::user(
            "see file".to_string(),
            Some(Attachment {
                file_name: "notes.txt".into(),
                data_url: "data:text/plain;base64,aGk=".into(),
                mime_type: "text/plain".into(),
                is_image: false,
            }),
        )];

        let html = render_history_html(&turns);

        assert!(html.contains("[notes.txt · text/plain]"));
        assert!(!html.contains("<img"));
    }
}
