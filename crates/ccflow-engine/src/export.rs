//! JSON output for downstream consumers: a metadata-first document for
//! programmatic querying, and an injection-safe payload for inlining inside
//! markup.

use std::collections::BTreeMap;

use ccflow_types::{Result, Segment, Session, Turn};
use serde::Serialize;

/// Summary header placed ahead of the segment data in JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub started: Option<String>,
    pub total_turns: usize,
    pub total_subagents: usize,
    pub compactions: usize,
}

#[derive(Serialize)]
pub struct SessionDocument<'a> {
    pub metadata: SessionMetadata,
    pub segments: &'a [Segment],
    pub subagents: &'a BTreeMap<String, Vec<Turn>>,
}

pub fn session_metadata(session: &Session, session_id: &str) -> SessionMetadata {
    SessionMetadata {
        session_id: session_id.to_string(),
        started: session
            .segments
            .first()
            .and_then(|segment| segment.turns.first())
            .map(|turn| turn.user_timestamp.clone()),
        total_turns: session.total_turns(),
        total_subagents: session.subagents.len(),
        compactions: session
            .segments
            .iter()
            .filter(|segment| segment.compact_metadata.is_some())
            .count(),
    }
}

/// Render the session (with metadata header) as a JSON document.
pub fn render_json(session: &Session, session_id: &str, compact: bool) -> Result<String> {
    let document = SessionDocument {
        metadata: session_metadata(session, session_id),
        segments: &session.segments,
        subagents: &session.subagents,
    };
    let json = if compact {
        serde_json::to_string(&document)?
    } else {
        serde_json::to_string_pretty(&document)?
    };
    Ok(json)
}

/// Encode the session for inlining inside a script element. Literal
/// `</script>` and `<!--` sequences are broken with unicode escapes so the
/// payload cannot terminate or comment out the surrounding markup.
pub fn embeddable_json(session: &Session) -> Result<String> {
    #[derive(Serialize)]
    struct Payload<'a> {
        segments: &'a [Segment],
        subagents: &'a BTreeMap<String, Vec<Turn>>,
    }

    let json = serde_json::to_string(&Payload {
        segments: &session.segments,
        subagents: &session.subagents,
    })?;
    Ok(json
        .replace("</script>", "</scr\\u0069pt>")
        .replace("<!--", "<\\u0021--"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_session;
    use crate::loader::parse_records;

    fn session_with_text(text: &str) -> Session {
        let line = serde_json::json!({
            "uuid": "1", "type": "user",
            "timestamp": "2026-01-17T10:00:00Z",
            "message": {"content": [{"type": "text", "text": text}]}
        });
        build_session(parse_records(&line.to_string()))
    }

    #[test]
    fn metadata_counts_turns_and_compactions() {
        let session = session_with_text("hello");
        let metadata = session_metadata(&session, "abc");
        assert_eq!(metadata.session_id, "abc");
        assert_eq!(metadata.started.as_deref(), Some("2026-01-17T10:00:00Z"));
        assert_eq!(metadata.total_turns, 1);
        assert_eq!(metadata.total_subagents, 0);
        assert_eq!(metadata.compactions, 0);
    }

    #[test]
    fn metadata_of_empty_session_is_defaulted() {
        let metadata = session_metadata(&Session::default(), "x");
        assert!(metadata.started.is_none());
        assert_eq!(metadata.total_turns, 0);
    }

    #[test]
    fn document_puts_metadata_first() {
        let session = session_with_text("hello");
        let json = render_json(&session, "abc", true).unwrap();
        assert!(json.starts_with("{\"metadata\""));
        assert!(json.contains("\"segments\""));
        assert!(json.contains("\"subagents\""));
        // Compact output is a single line.
        assert!(!json.contains('\n'));
    }

    #[test]
    fn embeddable_json_breaks_script_close() {
        let session = session_with_text("evil</script><script>alert(1)");
        let json = embeddable_json(&session).unwrap();
        assert!(!json.contains("</script>"));
        assert!(json.contains("</scr\\u0069pt>"));
    }

    #[test]
    fn embeddable_json_breaks_comment_open() {
        let session = session_with_text("sneaky <!-- comment");
        let json = embeddable_json(&session).unwrap();
        assert!(!json.contains("<!--"));
        assert!(json.contains("<\\u0021--"));
    }
}
