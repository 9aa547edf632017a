//! Plain-text rendering of a replay report.

use std::fmt::Write;

use super::runner::ReplayReport;
use crate::application::ThreadNode;
use crate::domain::entities::{Message, MessageKind};

/// Renders the thread tree, one message per line, replies indented.
#[must_use]
pub fn render_threads(threads: &[ThreadNode]) -> String {
    let mut out = String::new();
    for node in threads {
        let _ = writeln!(out, "{}", message_line(&node.root));
        for reply in &node.replies {
            let _ = writeln!(out, "  -> {}", message_line(reply));
        }
    }
    out
}

#[must_use]
pub fn render_report(report: &ReplayReport) -> String {
    let mut out = render_threads(&report.threads);

    if let Some(typing) = &report.typing {
        let _ = writeln!(out, "{typing}");
    }
    if let Some(error) = &report.error {
        let _ = writeln!(out, "error: {error}");
    }
    if report.has_more {
        let _ = writeln!(out, "(older messages available)");
    }
    out
}

fn message_line(message: &Message) -> String {
    let mut line = format!(
        "[{}] {}: {}",
        message.formatted_timestamp(),
        message.sender().display_name(),
        body(message)
    );

    if message.is_edited() {
        line.push_str(" (edited)");
    }
    if message.is_optimistic() {
        line.push_str(" (sending)");
    }
    for reaction in message.reactions() {
        let _ = write!(line, " [{} {}]", reaction.emoji(), reaction.count());
    }
    line
}

fn body(message: &Message) -> String {
    match message.kind() {
        MessageKind::Voice => match message.transcript() {
            Some(transcript) => format!("(voice) {transcript}"),
            None => "(voice)".to_string(),
        },
        MessageKind::File | MessageKind::Image => match message.attachment() {
            Some(attachment) if message.content().is_empty() => {
                format!("<{}>", attachment.filename())
            }
            Some(attachment) => format!("{} <{}>", message.content(), attachment.filename()),
            None => message.content().to_string(),
        },
        MessageKind::Text | MessageKind::System => message.content().to_string(),
    }
}
