use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of a Claude Code transcript, read leniently.
///
/// Every record kind (user, assistant, system, summary, ...) funnels through
/// this single shape; all fields are defaulted so a missing field never
/// rejects a line. Parent pointers are untrusted input and are resolved
/// later against an explicit index, never chased directly.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRecord {
    pub uuid: Option<String>,
    pub parent_uuid: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub subtype: String,
    pub timestamp: String,
    pub message: Option<RecordMessage>,
    pub compact_metadata: Option<RawCompactMetadata>,
    pub subagent_id: Option<String>,
    pub is_compact_summary: bool,
    pub is_visible_in_transcript_only: bool,
}

impl RawRecord {
    /// Content items of the message payload, empty when there is none.
    pub fn content(&self) -> &[ContentItem] {
        self.message
            .as_ref()
            .map(|message| message.content.as_slice())
            .unwrap_or(&[])
    }

    pub fn id(&self) -> Option<&str> {
        self.uuid.as_deref().filter(|id| !id.is_empty())
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_uuid.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecordMessage {
    #[serde(default, deserialize_with = "string_or_items")]
    pub content: Vec<ContentItem>,
}

/// Plain-string message content is normalized into a single text item.
fn string_or_items<'de, D>(deserializer: D) -> Result<Vec<ContentItem>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrItems {
        Text(String),
        Items(Vec<ContentItem>),
    }

    Ok(match StringOrItems::deserialize(deserializer)? {
        StringOrItems::Text(text) => vec![ContentItem::Text { text }],
        StringOrItems::Items(items) => items,
    })
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        #[serde(default)]
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: String,
        /// A plain string or a list of typed parts, depending on the tool.
        #[serde(default)]
        content: Value,
    },
    Image {
        #[serde(default)]
        source: Value,
    },
    #[serde(other)]
    Unknown,
}

/// Compaction details a boundary record carries.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCompactMetadata {
    pub trigger: Option<String>,
    pub pre_tokens: Option<u64>,
}
