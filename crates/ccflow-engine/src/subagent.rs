//! Subagent assembly: the same segment/collect pipeline run over each
//! subagent's records, flattened to a single turn list per agent.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ccflow_types::Turn;

use crate::loader::load_records;
use crate::schema::RawRecord;
use crate::segment::build_segments;

/// Assemble one subagent's records into its flat turn list. Subagents keep
/// no compaction-segmented view; their segments collapse into one sequence.
pub fn assemble_subagent(records: &[RawRecord]) -> Vec<Turn> {
    build_segments(records)
        .into_iter()
        .flat_map(|segment| segment.turns)
        .collect()
}

/// Load externally stored subagent transcripts from `<dir>/subagents/`.
///
/// Files are named `agent-<id>.jsonl`. Subagent files are written out of
/// band and may not exist yet, so a missing or unreadable directory is
/// simply an empty result.
pub fn load_external_subagents(session_dir: &Path) -> BTreeMap<String, Vec<Turn>> {
    let mut subagents = BTreeMap::new();
    let subagent_dir = session_dir.join("subagents");
    let Ok(entries) = fs::read_dir(&subagent_dir) else {
        return subagents;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "jsonl") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let agent_id = stem.strip_prefix("agent-").unwrap_or(stem).to_string();
        let Ok(records) = load_records(&path) else {
            continue;
        };
        subagents.insert(agent_id, assemble_subagent(&records));
    }
    subagents
}
