// Engine crate - transcript reconstruction logic.
// Rebuilds the implicit conversation tree from flat, parent-linked records,
// segments it at compaction boundaries, folds tool traffic into turns and
// assembles subagent transcripts. Pure and synchronous: records in, Session
// out; nothing in here is fatal because transcripts are routinely partial.

pub mod classify;
mod collect;
mod export;
mod index;
mod loader;
pub mod schema;
mod segment;
mod subagent;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ccflow_types::{Result, Session};

use schema::RawRecord;

// Facade API - stable surface for the CLI layer.

pub use collect::collect_turns;
pub use export::{SessionDocument, SessionMetadata, embeddable_json, render_json, session_metadata};
pub use index::RecordIndex;
pub use loader::{load_records, parse_records};
pub use segment::{build_segments, partition_by_subagent};
pub use subagent::{assemble_subagent, load_external_subagents};

/// Assemble a session from in-memory records: main-thread segments plus any
/// inline-embedded subagent groups. Pure; no I/O.
pub fn build_session(records: Vec<RawRecord>) -> Session {
    let (main, groups) = partition_by_subagent(records);
    let segments = build_segments(&main);

    let mut subagents = BTreeMap::new();
    for (agent_id, group) in groups {
        subagents.insert(agent_id, assemble_subagent(&group));
    }

    Session {
        segments,
        subagents,
    }
}

/// Parse a transcript file into a Session, merging externally stored
/// subagent transcripts from the sibling session directory. Inline subagent
/// data wins over external files for the same agent id, since inline records
/// reflect the live state.
pub fn parse_session(path: &Path) -> Result<Session> {
    let records = load_records(path)?;
    if records.is_empty() {
        return Ok(Session::default());
    }

    let mut session = build_session(records);

    let mut merged = load_external_subagents(&session_dir_for(path));
    merged.append(&mut session.subagents);
    session.subagents = merged;

    Ok(session)
}

/// `<parent>/<file-stem>/`, where external subagent transcripts live.
fn session_dir_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    path.parent().unwrap_or_else(|| Path::new(".")).join(stem)
}
