//! Terminal rendering of markdown message bodies

use crate::api::{Message, Origin, Sender};
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

const CODE_INDENT: &str = "    ";

/// Render markdown as plain terminal text. With `ansi`, headings and strong
/// text are bold and emphasis is italic; without it the markers are dropped.
pub fn render_markdown(markdown: &str, ansi: bool) -> String {
    let mut out = String::new();
    // One entry per open list: the next ordinal for ordered lists
    let mut lists: Vec<Option<u64>> = Vec::new();
    // Destination and text start offset of the open link
    let mut link: Option<(String, usize)> = None;
    let mut in_code_block = false;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Paragraph) if lists.is_empty() => block_break(&mut out),
            Event::Start(Tag::Heading { .. }) => {
                block_break(&mut out);
                style(&mut out, ansi, BOLD);
            }
            Event::End(TagEnd::Heading(_)) | Event::End(TagEnd::Strong | TagEnd::Emphasis) => {
                style(&mut out, ansi, RESET);
            }
            Event::Start(Tag::Strong) => style(&mut out, ansi, BOLD),
            Event::Start(Tag::Emphasis) => style(&mut out, ansi, ITALIC),
            Event::Start(Tag::List(start)) => {
                if lists.is_empty() {
                    block_break(&mut out);
                }
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
            }
            Event::Start(Tag::Item) => {
                line_break(&mut out);
                let depth = lists.len().saturating_sub(1);
                out.push_str(&"  ".repeat(depth));
                match lists.last_mut() {
                    Some(Some(n)) => {
                        out.push_str(&format!("{n}. "));
                        *n += 1;
                    }
                    _ => out.push_str("• "),
                }
            }
            Event::End(TagEnd::Item) => line_break(&mut out),
            Event::Start(Tag::CodeBlock(_)) => {
                block_break(&mut out);
                in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Start(Tag::Link { dest_url, .. }) => {
                link = Some((dest_url.to_string(), out.len()));
            }
            Event::End(TagEnd::Link) => {
                if let Some((url, start)) = link.take() {
                    // Autolinks already show the address
                    if out.get(start..) != Some(url.as_str()) {
                        out.push_str(&format!(" ({url})"));
                    }
                }
            }
            Event::Text(text) if in_code_block => {
                for line in text.lines() {
                    out.push_str(CODE_INDENT);
                    out.push_str(line);
                    out.push('\n');
                }
            }
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                out.push_str(&text);
            }
            Event::Code(code) => {
                out.push('`');
                out.push_str(&code);
                out.push('`');
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => {
                block_break(&mut out);
                out.push_str("───");
            }
            _ => {}
        }
    }

    out.truncate(out.trim_end().len());
    out
}

/// Render one buffer entry with its speaker label
pub fn render_message(message: &Message, assistant_name: &str, ansi: bool) -> String {
    let label = match message.sender {
        Sender::User => "You",
        Sender::Bot => assistant_name,
    };

    match message.origin {
        Origin::Placeholder => {
            let mut out = String::new();
            style(&mut out, ansi, DIM);
            out.push_str(&message.text);
            style(&mut out, ansi, RESET);
            out
        }
        Origin::Optimistic => {
            format!("{label}: {} (sending)", render_markdown(&message.text, ansi))
        }
        Origin::Confirmed | Origin::Fallback => {
            let body = render_markdown(&message.text, ansi);
            if body.contains('\n') {
                format!("{label}:\n{body}")
            } else {
                format!("{label}: {body}")
            }
        }
    }
}

fn style(out: &mut String, ansi: bool, code: &str) {
    if ansi {
        out.push_str(code);
    }
}

fn line_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn block_break(out: &mut String) {
    if out.is_empty() {
        return;
    }
    while !out.ends_with("\n\n") {
        out.push('\n');
    }
}
