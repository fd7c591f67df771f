//! Segmentation: routes records to their subagent groups and splits the
//! main thread at compaction boundaries.

use std::collections::{BTreeMap, HashSet, VecDeque};

use ccflow_types::{CompactMetadata, Segment, SegmentKind};

use crate::classify::is_user_turn;
use crate::collect::collect_turns;
use crate::index::RecordIndex;
use crate::schema::RawRecord;

/// Subtype tag on the synthetic record that opens a post-compaction thread.
pub const COMPACT_BOUNDARY_SUBTYPE: &str = "compact_boundary";

/// Route every record carrying a subagent association to that agent's group;
/// everything else (including empty associations) stays in the main group.
pub fn partition_by_subagent(
    records: Vec<RawRecord>,
) -> (Vec<RawRecord>, BTreeMap<String, Vec<RawRecord>>) {
    let mut main = Vec::new();
    let mut subagents: BTreeMap<String, Vec<RawRecord>> = BTreeMap::new();
    for record in records {
        match record.subagent_id.clone() {
            Some(id) if !id.is_empty() => subagents.entry(id).or_default().push(record),
            _ => main.push(record),
        }
    }
    (main, subagents)
}

/// Partition the record set into root-anchored segments.
///
/// Each compaction boundary root opens its own `continuation` segment,
/// carrying the boundary's metadata forward. Every other root funnels into
/// one shared `original` segment, so independent parentless turns (the
/// leftovers of a truncated log) read as a single thread. Roots that are not
/// themselves user-turns anchor at their first reachable user-turn; a
/// segment with no reachable user-turn is dropped. Segments are finally
/// sorted by start timestamp and renumbered, so segment identity is
/// chronological, not traversal order.
pub fn build_segments(records: &[RawRecord]) -> Vec<Segment> {
    struct Draft<'a> {
        kind: SegmentKind,
        timestamp: String,
        compact_metadata: Option<CompactMetadata>,
        anchors: Vec<&'a str>,
    }

    let index = RecordIndex::build(records);
    let mut drafts: Vec<Draft> = Vec::new();
    let mut original_draft: Option<usize> = None;

    for root_id in index.roots(records) {
        let Some(root) = index.get(root_id) else {
            continue;
        };
        let is_boundary = root.subtype == COMPACT_BOUNDARY_SUBTYPE;
        let compact_metadata = root.compact_metadata.as_ref().map(|meta| CompactMetadata {
            trigger: meta.trigger.clone().unwrap_or_else(|| "unknown".to_string()),
            pre_tokens: meta.pre_tokens.unwrap_or(0),
        });

        let draft_idx = if is_boundary {
            drafts.push(Draft {
                kind: SegmentKind::Continuation,
                timestamp: root.timestamp.clone(),
                compact_metadata,
                anchors: Vec::new(),
            });
            drafts.len() - 1
        } else {
            *original_draft.get_or_insert_with(|| {
                drafts.push(Draft {
                    kind: SegmentKind::Original,
                    timestamp: root.timestamp.clone(),
                    compact_metadata,
                    anchors: Vec::new(),
                });
                drafts.len() - 1
            })
        };

        let anchor = if is_user_turn(root) {
            Some(root_id)
        } else {
            find_first_user_turn(&index, root_id)
        };
        if let Some(anchor) = anchor {
            drafts[draft_idx].anchors.push(anchor);
        }
    }

    let mut segments: Vec<Segment> = Vec::new();
    for draft in drafts {
        if draft.anchors.is_empty() {
            continue;
        }
        let turns = collect_turns(&index, &draft.anchors);
        if turns.is_empty() {
            continue;
        }
        segments.push(Segment {
            id: segments.len(),
            kind: draft.kind,
            timestamp: draft.timestamp,
            turns,
            compact_metadata: draft.compact_metadata,
        });
    }

    segments.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    for (idx, segment) in segments.iter_mut().enumerate() {
        segment.id = idx;
    }
    segments
}

/// Breadth-first search for the first reachable user-turn under `start_id`.
fn find_first_user_turn<'a>(index: &RecordIndex<'a>, start_id: &'a str) -> Option<&'a str> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&'a str> = VecDeque::from([start_id]);

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        if let Some(record) = index.get(id)
            && is_user_turn(record)
        {
            return Some(id);
        }
        for child in index.children(id) {
            if !visited.contains(child) {
                queue.push_back(child);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccflow_types::BlockKind;
    use serde_json::json;

    fn records(values: Vec<serde_json::Value>) -> Vec<RawRecord> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }

    #[test]
    fn empty_records_yield_no_segments() {
        assert!(build_segments(&[]).is_empty());
    }

    #[test]
    fn single_user_message_is_one_segment() {
        let recs = records(vec![json!({
            "uuid": "1", "type": "user",
            "timestamp": "2026-01-17T10:00:00Z",
            "message": {"content": [{"type": "text", "text": "hello"}]}
        })]);
        let segments = build_segments(&recs);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::Original);
        assert_eq!(segments[0].turns.len(), 1);
    }

    #[test]
    fn independent_user_roots_share_one_segment() {
        let recs = records(vec![
            json!({
                "uuid": "1", "type": "user",
                "timestamp": "2026-01-17T10:00:00Z",
                "message": {"content": [{"type": "text", "text": "first"}]}
            }),
            json!({
                "uuid": "2", "type": "user",
                "timestamp": "2026-01-17T10:05:00Z",
                "message": {"content": [{"type": "text", "text": "second"}]}
            }),
        ]);
        let segments = build_segments(&recs);
        assert_eq!(segments.len(), 1);
        let turns = &segments[0].turns;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].id, 0);
        assert_eq!(turns[1].id, 1);
        assert!(turns.iter().all(|t| !t.is_branch));
        assert!(turns.iter().all(|t| t.children_turn_ids.is_empty()));
        assert!(turns.iter().all(|t| t.parent_turn_id.is_none()));
    }

    #[test]
    fn compaction_boundary_opens_a_continuation() {
        let recs = records(vec![
            json!({
                "uuid": "1", "type": "user",
                "timestamp": "2026-01-17T10:00:00Z",
                "message": {"content": [{"type": "text", "text": "before compaction"}]}
            }),
            json!({
                "uuid": "b1", "type": "system", "subtype": "compact_boundary",
                "timestamp": "2026-01-17T11:00:00Z",
                "compactMetadata": {"trigger": "auto", "preTokens": 162000}
            }),
            json!({
                "uuid": "2", "parentUuid": "b1", "type": "user",
                "timestamp": "2026-01-17T11:00:01Z",
                "message": {"content": [{"type": "text", "text": "after compaction"}]}
            }),
        ]);
        let segments = build_segments(&recs);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].kind, SegmentKind::Original);
        assert_eq!(segments[1].kind, SegmentKind::Continuation);
        let meta = segments[1].compact_metadata.as_ref().unwrap();
        assert_eq!(meta.trigger, "auto");
        assert_eq!(meta.pre_tokens, 162000);
    }

    #[test]
    fn boundary_metadata_defaults_when_fields_missing() {
        let recs = records(vec![
            json!({
                "uuid": "b1", "type": "system", "subtype": "compact_boundary",
                "timestamp": "2026-01-17T11:00:00Z",
                "compactMetadata": {}
            }),
            json!({
                "uuid": "2", "parentUuid": "b1", "type": "user",
                "timestamp": "2026-01-17T11:00:01Z",
                "message": {"content": [{"type": "text", "text": "after"}]}
            }),
        ]);
        let segments = build_segments(&recs);
        assert_eq!(segments.len(), 1);
        let meta = segments[0].compact_metadata.as_ref().unwrap();
        assert_eq!(meta.trigger, "unknown");
        assert_eq!(meta.pre_tokens, 0);
    }

    #[test]
    fn boundary_with_no_reachable_user_turn_yields_nothing() {
        let recs = records(vec![json!({
            "uuid": "b1", "type": "system", "subtype": "compact_boundary",
            "timestamp": "2026-01-17T11:00:00Z"
        })]);
        assert!(build_segments(&recs).is_empty());
    }

    #[test]
    fn non_user_root_searches_forward_for_anchor() {
        let recs = records(vec![
            json!({
                "uuid": "s1", "type": "system",
                "timestamp": "2026-01-17T10:00:00Z"
            }),
            json!({
                "uuid": "1", "parentUuid": "s1", "type": "user",
                "timestamp": "2026-01-17T10:00:01Z",
                "message": {"content": [{"type": "text", "text": "hello"}]}
            }),
        ]);
        let segments = build_segments(&recs);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::Original);
        assert_eq!(segments[0].turns[0].user_message, "hello");
    }

    #[test]
    fn segments_renumber_in_chronological_order() {
        // Continuation written before the original in file order.
        let recs = records(vec![
            json!({
                "uuid": "b1", "type": "system", "subtype": "compact_boundary",
                "timestamp": "2026-01-17T12:00:00Z",
                "compactMetadata": {"trigger": "manual", "preTokens": 9000}
            }),
            json!({
                "uuid": "2", "parentUuid": "b1", "type": "user",
                "timestamp": "2026-01-17T12:00:01Z",
                "message": {"content": [{"type": "text", "text": "late"}]}
            }),
            json!({
                "uuid": "1", "type": "user",
                "timestamp": "2026-01-17T09:00:00Z",
                "message": {"content": [{"type": "text", "text": "early"}]}
            }),
        ]);
        let segments = build_segments(&recs);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].id, 0);
        assert_eq!(segments[0].kind, SegmentKind::Original);
        assert_eq!(segments[0].turns[0].user_message, "early");
        assert_eq!(segments[1].id, 1);
        assert_eq!(segments[1].kind, SegmentKind::Continuation);
    }

    #[test]
    fn user_and_assistant_make_one_turn_with_blocks() {
        let recs = records(vec![
            json!({
                "uuid": "1", "type": "user",
                "timestamp": "2026-01-17T10:00:00Z",
                "message": {"content": [{"type": "text", "text": "hello"}]}
            }),
            json!({
                "uuid": "2", "parentUuid": "1", "type": "assistant",
                "timestamp": "2026-01-17T10:00:05Z",
                "message": {"content": [{"type": "text", "text": "hi there"}]}
            }),
        ]);
        let segments = build_segments(&recs);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].turns.len(), 1);
        assert_eq!(segments[0].turns[0].blocks.len(), 1);
        assert_eq!(segments[0].turns[0].blocks[0].kind, BlockKind::Text);
    }

    #[test]
    fn partition_routes_by_subagent_id() {
        let recs = records(vec![
            json!({"uuid": "1", "type": "user"}),
            json!({"uuid": "2", "type": "assistant", "subagentId": "agent-a"}),
            json!({"uuid": "3", "type": "user", "subagentId": "agent-a"}),
            json!({"uuid": "4", "type": "assistant", "subagentId": "agent-b"}),
        ]);
        let (main, subagents) = partition_by_subagent(recs);
        assert_eq!(main.len(), 1);
        assert_eq!(subagents["agent-a"].len(), 2);
        assert_eq!(subagents["agent-b"].len(), 1);
    }

    #[test]
    fn empty_or_null_subagent_id_stays_main() {
        let recs = records(vec![
            json!({"uuid": "1", "type": "user", "subagentId": ""}),
            json!({"uuid": "2", "type": "user", "subagentId": null}),
        ]);
        let (main, subagents) = partition_by_subagent(recs);
        assert_eq!(main.len(), 2);
        assert!(subagents.is_empty());
    }

    #[test]
    fn turn_count_matches_user_records_for_flat_sets() {
        let recs: Vec<RawRecord> = records(
            (0..5)
                .map(|i| {
                    json!({
                        "uuid": format!("user-{:04}", i),
                        "type": "user",
                        "timestamp": "2026-01-17T10:00:00Z",
                        "message": {"content": [{"type": "text", "text": format!("msg {}", i)}]}
                    })
                })
                .collect(),
        );
        let segments = build_segments(&recs);
        let total: usize = segments.iter().map(|s| s.turns.len()).sum();
        assert_eq!(total, 5);
    }
}
