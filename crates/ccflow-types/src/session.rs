use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kinds of content blocks folded into a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Thinking,
    Text,
    ToolUse,
    ToolResult,
}

/// One piece of assistant-side content inside a turn.
///
/// `content` holds the displayed (possibly truncated) text. When truncation
/// happened, `full_content` retains the original and `is_truncated` is set;
/// otherwise `full_content` is `None`. The UI relies on that equivalence to
/// decide whether to offer expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub content: String,
    /// Time-of-day slice of the source record timestamp (HH:MM:SS).
    pub timestamp: Option<String>,
    /// Tool name, for tool_use blocks.
    pub tool_name: Option<String>,
    /// Truncated input preview, for tool_use blocks.
    pub tool_input: Option<String>,
    /// Call id linking a tool_use to its tool_result.
    pub tool_use_id: Option<String>,
    /// Id of the subagent this call spawned, when one was detected.
    pub child_agent_id: Option<String>,
    /// Named subagent kind carried by a dispatch tool input.
    pub subagent_type: Option<String>,
    pub full_content: Option<String>,
    pub is_truncated: bool,
}

impl Block {
    pub fn new(kind: BlockKind, content: impl Into<String>, timestamp: Option<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            timestamp,
            tool_name: None,
            tool_input: None,
            tool_use_id: None,
            child_agent_id: None,
            subagent_type: None,
            full_content: None,
            is_truncated: false,
        }
    }
}

/// One user message plus everything causally descending from it, up to but
/// not including the next user message(s).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Sequence number in discovery order, scoped to the owning segment or
    /// subagent. Starts at 0.
    pub id: usize,
    pub user_message: String,
    pub user_timestamp: String,
    /// Content blocks, chronologically sorted.
    pub blocks: Vec<Block>,
    pub parent_turn_id: Option<usize>,
    pub children_turn_ids: Vec<usize>,
    /// True iff this turn is one of two or more siblings under the same
    /// parent event (the user edited history or retried).
    pub is_branch: bool,
    /// True for harness-injected messages (compaction summaries, command
    /// markers, system reminders).
    pub is_system: bool,
    /// Paths harvested from image placeholder records under this turn.
    pub image_paths: Vec<String>,
}

/// What triggered a compaction and how large the context was before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactMetadata {
    pub trigger: String,
    pub pre_tokens: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Thread starting at a genuine session start.
    Original,
    /// Thread starting right after a compaction boundary.
    Continuation,
}

/// A maximal contiguous thread of turns between compaction boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Positional id after the chronological sort, contiguous from 0.
    pub id: usize,
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    /// Timestamp of the segment's root record.
    pub timestamp: String,
    pub turns: Vec<Turn>,
    pub compact_metadata: Option<CompactMetadata>,
}

/// A whole reconstructed conversation: segments in chronological order plus
/// each subagent's flattened turn list, keyed by agent id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub segments: Vec<Segment>,
    pub subagents: BTreeMap<String, Vec<Turn>>,
}

impl Session {
    pub fn total_turns(&self) -> usize {
        self.segments.iter().map(|segment| segment.turns.len()).sum()
    }
}
