//! Pure predicates that sort raw records into user turns, placeholders and
//! system-injected messages. No state, no side effects; the collector and
//! segmenter lean on these everywhere.

use crate::schema::{ContentItem, RawRecord};

/// Marker prefix of the synthetic follow-up record a pasted image produces.
pub const IMAGE_MARKER: &str = "[Image: source:";

/// Prefixes identifying text injected by the harness rather than typed by
/// the user.
const SYSTEM_PREFIXES: &[&str] = &[
    "This session is being continued",
    "<local-command",
    "<command-name>",
    "<command-message>",
    "<system-reminder>",
    "[Request interrupted",
    IMAGE_MARKER,
];

/// A genuine user turn: a user record whose first content item is not a
/// tool result and which is not an image placeholder.
pub fn is_user_turn(record: &RawRecord) -> bool {
    if record.kind != "user" {
        return false;
    }
    let Some(first) = record.content().first() else {
        return false;
    };
    if matches!(first, ContentItem::ToolResult { .. }) {
        return false;
    }
    !is_image_placeholder(record)
}

/// Detect the synthetic record a pasted image generates: either marker text
/// (`[Image: source: <path>]`) or image items with no real text. Any
/// meaningful text alongside an image means a genuine message.
///
/// Only the exact marker prefix counts; user-authored text like
/// `[Image: I think...]` stays a real turn.
pub fn is_image_placeholder(record: &RawRecord) -> bool {
    if record.kind != "user" {
        return false;
    }
    let content = record.content();
    if content.is_empty() {
        return false;
    }

    let mut has_image = false;
    let mut has_marker_text = false;
    for item in content {
        match item {
            ContentItem::Image { .. } => has_image = true,
            ContentItem::Text { text } => {
                if text.starts_with(IMAGE_MARKER) {
                    has_marker_text = true;
                } else if !text.trim().is_empty() {
                    return false;
                }
            }
            _ => return false,
        }
    }
    has_marker_text || has_image
}

/// Text-prefix heuristic for system-injected user messages.
pub fn is_system_message(text: &str) -> bool {
    SYSTEM_PREFIXES.iter().any(|prefix| text.starts_with(prefix))
}

/// Record-level system check: explicit flags are authoritative, the text
/// prefix heuristic is the fallback. Kept as two ordered phases so each can
/// be exercised on its own.
pub fn is_system_record(record: &RawRecord) -> bool {
    if record.is_compact_summary || record.is_visible_in_transcript_only {
        return true;
    }
    match record.content().first() {
        Some(ContentItem::Text { text }) => is_system_message(text),
        _ => false,
    }
}
