//! Diagnostic formatting for the two output modes.

use ward_core::Entry;

use crate::args::OutputMode;

/// Opening text emitted before any entry, if the mode has one.
pub fn header(mode: OutputMode) -> Option<String> {
    match mode {
        OutputMode::Compiler => None,
        OutputMode::Html => Some("<html><body><ul>".to_string()),
    }
}

/// Format one entry, or `None` if the mode suppresses it (the compiler
/// mode skips progress notes).
pub fn format_entry(mode: OutputMode, entry: &Entry) -> Option<String> {
    match mode {
        OutputMode::Compiler => match entry {
            Entry::Note(..) => None,
            _ => Some(format!(
                "{}: {}: {}",
                entry.pos(),
                entry.kind(),
                entry.text()
            )),
        },
        OutputMode::Html => Some(format!(
            "<li class=\"{}\">{}: {}</li>",
            entry.kind(),
            entry.pos(),
            escape(entry.text())
        )),
    }
}

/// Closing text with the summary line; always emitted.
pub fn footer(mode: OutputMode, warnings: usize, errors: usize) -> String {
    let summary = format!("Warnings: {warnings}, Errors: {errors}");
    match mode {
        OutputMode::Compiler => summary,
        OutputMode::Html => format!("</ul><p>{summary}</p></body></html>"),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
