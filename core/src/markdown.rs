use colored::*;
use lazy_static::lazy_static;
use pulldown_cmark::{html, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

const THEME_NAME: &str = "base16-ocean.dark";

lazy_static! {
    static ref SYNTAX_SET: SyntaxSet = SyntaxSet::load_defaults_newlines();
    static ref THEME_SET: ThemeSet = ThemeSet::load_defaults();
}

lazy_static! {
    static ref FALLBACK_THEME: Theme = Theme::default();
}

fn theme() -> &'static Theme {
    THEME_SET
        .themes
        .get(THEME_NAME)
        .or_else(|| THEME_SET.themes.values().next())
        .unwrap_or(&FALLBACK_THEME)
}

fn syntax_for(lang: &str) -> &'static SyntaxReference {
    if lang.is_empty() {
        return SYNTAX_SET.find_syntax_plain_text();
    }
    SYNTAX_SET
        .find_syntax_by_token(lang)
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text())
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Whether a link or image destination is safe to emit. Relative targets are
/// kept, absolute ones must use an allowed scheme.
fn is_safe_destination(dest: &str, image: bool) -> bool {
    // Browsers ignore whitespace and control characters inside a scheme.
    let normalized: String = dest
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let scheme_end = match normalized.find(|c| matches!(c, ':' | '/' | '?' | '#')) {
        Some(idx) if normalized[idx..].starts_with(':') => idx,
        _ => return true,
    };

    match &normalized[..scheme_end] {
        "http" | "https" => true,
        "mailto" => !image,
        "data" => image && normalized.starts_with("data:image/"),
        _ => false,
    }
}

fn sanitize_tag(tag: Tag) -> Tag {
    match tag {
        Tag::Link(kind, dest, title) if !is_safe_destination(&dest, false) => {
            Tag::Link(kind, "#".into(), title)
        }
        Tag::Image(kind, dest, title) if !is_safe_destination(&dest, true) => {
            Tag::Image(kind, "#".into(), title)
        }
        other => other,
    }
}

/// Escapes plain text for embedding in HTML.
pub fn escape_html(text: &str) -> String {
    let mut output = String::new();
    html::push_html(&mut output, std::iter::once(Event::Text(text.into())));
    output
}

/// Renders markdown to HTML.
///
/// Raw HTML in the source is escaped rather than passed through, link and
/// image targets with unsafe schemes become `#`, and fenced code blocks are
/// highlighted with inline styles.
pub fn to_html(markdown: &str) -> String {
    let mut events: Vec<Event> = Vec::new();
    let mut code_lang: Option<String> = None;
    let mut code_content = String::new();

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                code_lang = Some(match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                });
                code_content.clear();
            }
            Event::End(Tag::CodeBlock(_)) => {
                let lang = code_lang.take().unwrap_or_default();
                let highlighted =
                    highlighted_html_for_string(&code_content, &SYNTAX_SET, syntax_for(&lang), theme())
                        .unwrap_or_else(|_| format!("<pre><code>{}</code></pre>\n", escape_html(&code_content)));
                events.push(Event::Html(highlighted.into()));
            }
            Event::Text(text) if code_lang.is_some() => code_content.push_str(&text),
            Event::Html(raw) => events.push(Event::Text(raw)),
            Event::Start(tag) => events.push(Event::Start(sanitize_tag(tag))),
            other => events.push(other),
        }
    }

    let mut output = String::new();
    html::push_html(&mut output, events.into_iter());
    output
}

/// Renders markdown for an ANSI terminal with syntax-highlighted code blocks.
pub fn to_terminal(markdown: &str) -> String {
    let mut in_code_block = false;
    let mut code_block_lang = String::new();
    let mut code_block_content = String::new();
    let mut output = String::new();

    let mut in_table = false;
    let mut in_table_cell = false;
    let mut current_row: Vec<String> = Vec::new();
    let mut table_rows: Vec<Vec<String>> = Vec::new();

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Start(Tag::Table(_)) => {
                in_table = true;
                table_rows.clear();
                output.push('\n');
            }
            Event::End(Tag::Table(_)) => {
                render_table(&table_rows, &mut output);
                in_table = false;
            }
            Event::Start(Tag::TableRow) | Event::Start(Tag::TableHead) => {
                current_row.clear();
            }
            Event::End(Tag::TableRow) | Event::End(Tag::TableHead) => {
                if !current_row.is_empty() {
                    table_rows.push(std::mem::take(&mut current_row));
                }
            }
            Event::Start(Tag::TableCell) => {
                in_table_cell = true;
                current_row.push(String::new());
            }
            Event::End(Tag::TableCell) => {
                in_table_cell = false;
            }
            Event::Start(Tag::Heading(level, ..)) => match level {
                HeadingLevel::H1 => output.push_str(&format!("\n{} ", "#".bright_cyan().bold())),
                HeadingLevel::H2 => output.push_str(&format!("\n{} ", "##".bright_cyan().bold())),
                _ => output.push('\n'),
            },
            Event::End(Tag::Heading(..)) => output.push('\n'),
            Event::Start(Tag::Paragraph) => {
                if !in_table && !output.is_empty() && !output.ends_with('\n') {
                    output.push_str("\n\n");
                }
            }
            Event::End(Tag::Paragraph) => {
                if !in_table {
                    output.push('\n');
                }
            }
            Event::Start(Tag::CodeBlock(info)) => {
                in_code_block = true;
                code_block_lang = match info {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code_block_content.clear();
                output.push('\n');
            }
            Event::End(Tag::CodeBlock(_)) => {
                let mut highlighter = HighlightLines::new(syntax_for(&code_block_lang), theme());

                if !code_block_lang.is_empty() {
                    output.push_str(&format!("{}:\n", code_block_lang.cyan()));
                }
                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push('\n');

                for line in LinesWithEndings::from(&code_block_content) {
                    let highlighted = highlighter
                        .highlight_line(line, &SYNTAX_SET)
                        .unwrap_or_default();
                    output.push_str(&as_24_bit_terminal_escaped(&highlighted, false));
                }
                output.push_str("\x1b[0m");

                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push_str("\n\n");
                in_code_block = false;
            }
            Event::Start(Tag::List(_)) | Event::End(Tag::List(_)) => output.push('\n'),
            Event::Start(Tag::Item) => output.push_str(&format!("{}  ", "•".yellow())),
            Event::End(Tag::Item) => output.push('\n'),
            Event::Code(code) => {
                if in_table_cell {
                    if let Some(cell) = current_row.last_mut() {
                        cell.push_str(&format!("`{}`", code));
                    }
                } else {
                    output.push_str(&format!("{}", code.on_bright_black().white()));
                }
            }
            Event::Text(text) => {
                if in_code_block {
                    code_block_content.push_str(&text);
                } else if in_table_cell {
                    if let Some(cell) = current_row.last_mut() {
                        cell.push_str(&text);
                    }
                } else {
                    output.push_str(&text);
                }
            }
            Event::Html(html) => {
                if !in_table_cell {
                    output.push_str(&html);
                }
            }
            Event::SoftBreak => {
                if !in_table_cell {
                    output.push(' ');
                }
            }
            Event::HardBreak => {
                if !in_table_cell {
                    output.push('\n');
                }
            }
            _ => {}
        }
    }

    output.trim_end().to_string()
}

fn render_table(rows: &[Vec<String>], output: &mut String) {
    if rows.is_empty() {
        return;
    }

    let col_count = rows.iter().map(|row| row.len()).max().unwrap_or(0);
    let mut col_widths = vec![0; col_count];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            col_widths[i] = col_widths[i].max(cell.chars().count());
        }
    }

    for (i, row) in rows.iter().enumerate() {
        for (j, cell) in row.iter().enumerate() {
            let padding = col_widths[j].saturating_sub(cell.chars().count());
            if i == 0 {
                output.push_str(&format!("{}{} ", cell.bold(), " ".repeat(padding)));
            } else {
                output.push_str(&format!("{}{} ", cell, " ".repeat(padding)));
            }
        }
        output.push('\n');

        // Header separator
        if i == 0 {
            let rule: Vec<String> = col_widths
                .iter()
                .map(|w| "─".repeat(*w).dimmed().to_string())
                .collect();
            output.push_str(&rule.join(" "));
            output.push('\n');
        }
    }
    output.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_reply_is_a_single_paragraph() {
        assert_eq!(to_html("hi there"), "<p>hi there</p>\n");
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = to_html("<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn fenced_code_is_highlighted() {
        let html = to_html("```rust\nfn main() {}\n```\n");
        assert!(html.starts_with("<pre style="));
        assert!(html.contains("main"));
        assert!(!html.contains("```"));
    }

    #[test]
    fn script_links_are_neutralized() {
        let html = to_html("[click](javascript:alert(document.cookie))");
        assert_eq!(html, "<p><a href=\"#\">click</a></p>\n");

        let html = to_html("[page](<vbscript:msgbox>) and [x](JAVASCRIPT:void(0))");
        assert!(!html.to_ascii_lowercase().contains("script:"));
    }

    #[test]
    fn web_and_relative_links_are_kept() {
        assert!(to_html("[a](https://example.com/x?y=1)").contains("href=\"https://example.com/x?y=1\""));
        assert!(to_html("[b](mailto:me@example.com)").contains("href=\"mailto:me@example.com\""));
        assert!(to_html("[c](docs/page.html#top)").contains("href=\"docs/page.html#top\""));
    }

    #[test]
    fn image_sources_allow_only_web_and_inline_images() {
        let html = to_html("![ok](data:image/png;base64,iVBORw==)");
        assert!(html.contains("src=\"data:image/png;base64,iVBORw==\""));

        let html = to_html("![bad](data:text/html;base64,PHNjcmlwdD4=)");
        assert!(html.contains("src=\"#\""));

        let html = to_html("[doc](data:image/svg+xml;base64,PHN2Zz4=)");
        assert!(html.contains("href=\"#\""));
    }

    #[test]
    fn escape_html_handles_markup() {
        assert_eq!(escape_html("a < b & c"), "a &lt; b &amp; c");
    }

    #[test]
    fn terminal_rendering_keeps_text() {
        colored::control::set_override(false);
        let rendered = to_terminal("# Title\n\nSome *text* here.\n\n- one\n- two");
        assert!(rendered.contains("Title"));
        assert!(rendered.contains("Some text here."));
        assert!(rendered.contains("• "));
        assert!(rendered.contains("one"));
    }

    #[test]
    fn terminal_table_aligns_columns() {
        colored::control::set_override(false);
        let rendered = to_terminal("| a | bb |\n|---|----|\n| ccc | d |\n");
        assert!(rendered.contains("a   bb"));
        assert!(rendered.contains("ccc d"));
    }
}
