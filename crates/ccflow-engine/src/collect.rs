//! The turn collector: walks the reconstructed tree from one or more anchor
//! user-turns, folds every non-turn descendant into ordered content blocks,
//! and recurses into child turns.

use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;

use ccflow_types::{Block, BlockKind, Turn};
use regex::Regex;
use serde_json::Value;

use crate::classify::{IMAGE_MARKER, is_image_placeholder, is_system_record, is_user_turn};
use crate::index::RecordIndex;
use crate::schema::{ContentItem, RawRecord};

/// Pattern a dispatch-style tool result uses to report the spawned agent.
static AGENT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"agentId:\s*([a-f0-9]+)").unwrap());

const THINKING_LIMIT: usize = 500;
const TOOL_INPUT_LIMIT: usize = 200;
const TOOL_RESULT_LIMIT: usize = 300;
const ELLIPSIS: &str = "...";

/// Argument names tried in priority order when previewing a tool invocation.
/// Falls through to the stringified full input when none match.
const PREVIEW_KEYS: &[&str] = &["command", "prompt", "pattern", "file_path", "query"];

/// Collect the turn tree reachable from the given anchors.
///
/// Sequence numbers are assigned in depth-first preorder via an explicit
/// worklist, so `turns[i].id == i` and every child id is greater than its
/// parent's. Anchors that turn out missing or invalid are skipped, as is any
/// unresolvable record along the walk: transcripts are routinely partial and
/// a dead branch is never an error.
pub fn collect_turns<'a>(index: &RecordIndex<'a>, anchors: &[&'a str]) -> Vec<Turn> {
    struct Pending<'a> {
        id: &'a str,
        parent: Option<usize>,
        is_branch: bool,
    }

    let mut turns: Vec<Turn> = Vec::new();
    let mut stack: Vec<Pending<'a>> = anchors
        .iter()
        .rev()
        .map(|id| Pending {
            id,
            parent: None,
            is_branch: false,
        })
        .collect();

    while let Some(pending) = stack.pop() {
        let Some(record) = index.get(pending.id) else {
            continue;
        };
        if !is_user_turn(record) {
            continue;
        }

        let turn_id = turns.len();
        let gathered = gather_descendants(index, pending.id);

        let user_message = record
            .content()
            .iter()
            .find_map(|item| match item {
                ContentItem::Text { text } => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_default();

        turns.push(Turn {
            id: turn_id,
            user_message,
            user_timestamp: record.timestamp.clone(),
            blocks: gathered.blocks,
            parent_turn_id: pending.parent,
            children_turn_ids: Vec::new(),
            is_branch: pending.is_branch,
            is_system: is_system_record(record),
            image_paths: gathered.image_paths,
        });
        if let Some(parent) = pending.parent {
            turns[parent].children_turn_ids.push(turn_id);
        }

        // Two or more sibling turns under one parent means the user edited
        // history or retried; every sibling gets flagged.
        let branch = gathered.child_candidates.len() > 1;
        for candidate in gathered.child_candidates.into_iter().rev() {
            stack.push(Pending {
                id: candidate,
                parent: Some(turn_id),
                is_branch: branch,
            });
        }
    }

    turns
}

struct Gathered<'a> {
    blocks: Vec<Block>,
    child_candidates: Vec<&'a str>,
    image_paths: Vec<String>,
}

/// Breadth-first sweep over one turn's descendants.
///
/// Fan-out stops at descendant user-turns (recorded as child candidates, not
/// expanded). Image placeholders contribute their marker paths but no block,
/// and are traversed through rather than treated as dead ends. The visited
/// set doubles as the cycle guard over the untrusted parent links.
fn gather_descendants<'a>(index: &RecordIndex<'a>, start_id: &'a str) -> Gathered<'a> {
    let mut blocks = Vec::new();
    let mut child_candidates = Vec::new();
    let mut image_paths = Vec::new();

    let mut visited: HashSet<&str> = HashSet::from([start_id]);
    let mut queue: VecDeque<&'a str> = index.children(start_id).iter().copied().collect();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        let Some(record) = index.get(id) else {
            continue;
        };

        if is_user_turn(record) {
            child_candidates.push(id);
            continue;
        }

        if is_image_placeholder(record) {
            harvest_image_paths(record, &mut image_paths);
        } else {
            emit_blocks(record, &mut blocks);
        }

        for child in index.children(id) {
            if !visited.contains(child) {
                queue.push_back(child);
            }
        }
    }

    blocks.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    link_spawned_agents(&mut blocks);

    Gathered {
        blocks,
        child_candidates,
        image_paths,
    }
}

/// Pull attachment paths out of a placeholder's marker text:
/// `[Image: source: /tmp/x.png]` -> `/tmp/x.png`.
fn harvest_image_paths(record: &RawRecord, paths: &mut Vec<String>) {
    for item in record.content() {
        if let ContentItem::Text { text } = item
            && let Some(rest) = text.strip_prefix(IMAGE_MARKER)
        {
            let path = rest.trim().trim_end_matches(']').trim();
            if !path.is_empty() {
                paths.push(path.to_string());
            }
        }
    }
}

fn emit_blocks(record: &RawRecord, blocks: &mut Vec<Block>) {
    let timestamp = block_timestamp(record);
    for item in record.content() {
        match item {
            ContentItem::Thinking { thinking } => {
                let (content, full) = clip(thinking, THINKING_LIMIT);
                let mut block = Block::new(BlockKind::Thinking, content, timestamp.clone());
                block.is_truncated = full.is_some();
                block.full_content = full;
                blocks.push(block);
            }
            ContentItem::Text { text } => {
                blocks.push(Block::new(BlockKind::Text, text.clone(), timestamp.clone()));
            }
            ContentItem::ToolUse { id, name, input } => {
                let preview = preview_tool_input(input);
                let (display, full) = clip(&preview, TOOL_INPUT_LIMIT);
                let mut block = Block::new(BlockKind::ToolUse, String::new(), timestamp.clone());
                block.tool_name = Some(name.clone());
                block.tool_input = Some(display);
                block.tool_use_id = Some(id.clone());
                block.subagent_type = input
                    .get("subagent_type")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                block.is_truncated = full.is_some();
                block.full_content = full;
                blocks.push(block);
            }
            ContentItem::ToolResult {
                tool_use_id,
                content,
            } => {
                let joined = join_tool_result(content);
                let child_agent_id = extract_agent_id(&joined);
                let (display, full) = clip(&joined, TOOL_RESULT_LIMIT);
                let mut block = Block::new(BlockKind::ToolResult, display, timestamp.clone());
                block.tool_use_id = Some(tool_use_id.clone());
                block.child_agent_id = child_agent_id;
                block.is_truncated = full.is_some();
                block.full_content = full;
                blocks.push(block);
            }
            ContentItem::Image { .. } | ContentItem::Unknown => {}
        }
    }
}

/// Back-patch each tool_use with the agent id its tool_result reported, so
/// the invocation itself becomes the navigable link to the subagent.
fn link_spawned_agents(blocks: &mut [Block]) {
    for i in 0..blocks.len() {
        if blocks[i].kind != BlockKind::ToolResult {
            continue;
        }
        let Some(agent_id) = blocks[i].child_agent_id.clone() else {
            continue;
        };
        let call_id = blocks[i].tool_use_id.clone();
        for j in (0..i).rev() {
            if blocks[j].kind == BlockKind::ToolUse && blocks[j].tool_use_id == call_id {
                blocks[j].child_agent_id = Some(agent_id);
                break;
            }
        }
    }
}

/// Clip to `max_len` characters, returning the display string and the
/// retained original iff clipping happened. Character-based so multi-byte
/// text never splits a code point.
pub(crate) fn clip(text: &str, max_len: usize) -> (String, Option<String>) {
    if text.chars().count() <= max_len {
        (text.to_string(), None)
    } else {
        let mut display: String = text.chars().take(max_len).collect();
        display.push_str(ELLIPSIS);
        (display, Some(text.to_string()))
    }
}

fn preview_tool_input(input: &Value) -> String {
    for key in PREVIEW_KEYS {
        if let Some(value) = input.get(key) {
            return stringify(value);
        }
    }
    stringify(input)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Tool result content may be a single string or a list of typed parts;
/// parts are joined by newline.
fn join_tool_result(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

fn extract_agent_id(text: &str) -> Option<String> {
    AGENT_ID_RE
        .captures(text)
        .map(|captures| captures[1].to_string())
}

/// Time-of-day slice (HH:MM:SS) of the record timestamp.
fn block_timestamp(record: &RawRecord) -> Option<String> {
    if record.timestamp.is_empty() {
        return None;
    }
    Some(record.timestamp.get(11..19).unwrap_or("").to_string())
}
