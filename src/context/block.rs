//! Text framing for the assembled context.

use crate::search::SearchResult;

pub const GRAPH_START: &str = "--- START KNOWLEDGE GRAPH CONTEXT ---\n";
pub const GRAPH_END: &str = "--- END KNOWLEDGE GRAPH CONTEXT ---\n";
pub const WEBSITE_START: &str = "\n--- START WEBSITE CONTENT ---\n";
pub const WEBSITE_END: &str = "--- END WEBSITE CONTENT ---\n";
pub const TRUNCATION_MARKER: &str = "... (context truncated)\n";

/// Frame non-empty graph text; empty text yields an empty block.
pub fn graph_block(graph_text: &str) -> String {
    if graph_text.is_empty() {
        return String::new();
    }
    format!("{}{}{}\n", GRAPH_START, graph_text, GRAPH_END)
}

/// One numbered entry per document, content cut to `content_chars`.
pub fn website_block(results: &[SearchResult], content_chars: usize) -> String {
    if results.is_empty() {
        return String::new();
    }
    let mut block = String::from(WEBSITE_START);
    for (i, doc) in results.iter().enumerate() {
        block.push_str(&format!("Document {}: Title: {}\n", i + 1, doc.title));
        block.push_str(&format!("Content: {}...\n", char_prefix(&doc.content, content_chars)));
        block.push_str(&format!("URL: {}\n\n", doc.url));
    }
    block.push_str(WEBSITE_END);
    block
}

/// Cut to at most `max_chars` characters, appending the marker when cut.
pub fn truncate(context: String, max_chars: usize) -> String {
    if context.chars().count() <= max_chars {
        return context;
    }
    let mut cut = char_prefix(&context, max_chars).to_string();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

/// Empty or boilerplate-only context becomes the empty string.
pub fn normalize(context: String) -> String {
    let trimmed = context.trim();
    let bare_frame = format!("{}{}", GRAPH_START, GRAPH_END);
    if trimmed.is_empty() || trimmed == bare_frame.trim() {
        String::new()
    } else {
        context
    }
}

fn char_prefix(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
