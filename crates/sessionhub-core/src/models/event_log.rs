//! JSONL event types for Claude Code session transcripts (spec.md §4.2, §4.3).
//!
//! One `SessionLine` per non-empty line of an assembled transcript. Field
//! names and aliases mirror the real on-wire format emitted by Claude Code,
//! including the `cache_read_input_tokens` / `cache_creation_input_tokens`
//! aliases real transcripts use (see SPEC_FULL.md section 12).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single line from a session transcript.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLine {
    #[serde(default)]
    pub session_id: Option<String>,

    /// Event type: "user", "assistant", "system", "summary", etc.
    #[serde(rename = "type")]
    pub line_type: String,

    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    /// This event's own uuid, referenced by `logical_parent_uuid` of a
    /// later event (spec.md §4.3 compaction card).
    #[serde(default)]
    pub uuid: Option<String>,

    /// For `system`/`compact_boundary` events: the uuid of the event being
    /// compacted away (spec.md §4.3).
    #[serde(default)]
    pub logical_parent_uuid: Option<String>,

    /// Present on `system` events with `subtype == "compact_boundary"`.
    #[serde(default)]
    pub subtype: Option<String>,

    #[serde(default)]
    pub compact_metadata: Option<CompactMetadata>,

    /// Message content (for user/assistant types).
    #[serde(default)]
    pub message: Option<SessionMessage>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactMetadata {
    /// `auto` or `manual` (spec.md §4.3).
    #[serde(default)]
    pub trigger: Option<String>,
}

/// Message content in a session event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMessage {
    #[serde(default)]
    pub role: Option<String>,

    /// Can be a plain string or an array of content blocks (tool_use,
    /// tool_result, text) depending on Claude Code version.
    #[serde(default)]
    pub content: Option<Value>,

    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// Token usage for an `assistant`-type event (spec.md §4.3 "tokens card").
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,

    #[serde(default)]
    pub output_tokens: u64,

    /// From `cache_read_input_tokens` in real transcripts.
    #[serde(default, alias = "cache_read_input_tokens")]
    pub cache_read_tokens: u64,

    /// From `cache_creation_input_tokens` in real transcripts.
    #[serde(default, alias = "cache_creation_input_tokens")]
    pub cache_write_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_read_tokens + self.cache_write_tokens
    }
}

/// A tool call content block, extracted from `message.content` array entries
/// of type `tool_use` (spec.md §4.3 "tools card").
#[derive(Debug, Clone)]
pub struct ToolUseBlock {
    pub id: String,
    pub name: String,
}

/// A tool result content block, extracted from `message.content` array
/// entries of type `tool_result`.
#[derive(Debug, Clone)]
pub struct ToolResultBlock {
    pub tool_use_id: String,
    pub is_error: bool,
}

/// Extract `tool_use` content blocks from a message's content value.
///
/// Handles both the plain-string and content-block-array shapes; the latter
/// is what real assistant messages use when invoking tools.
pub fn extract_tool_use_blocks(content: &Value) -> Vec<ToolUseBlock> {
    let Value::Array(blocks) = content else {
        return Vec::new();
    };
    blocks
        .iter()
        .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("tool_use"))
        .filter_map(|block| {
            let id = block.get("id")?.as_str()?.to_string();
            let name = block.get("name")?.as_str()?.to_string();
            Some(ToolUseBlock { id, name })
        })
        .collect()
}

/// Extract `tool_result` content blocks from a message's content value.
pub fn extract_tool_result_blocks(content: &Value) -> Vec<ToolResultBlock> {
    let Value::Array(blocks) = content else {
        return Vec::new();
    };
    blocks
        .iter()
        .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("tool_result"))
        .filter_map(|block| {
            let tool_use_id = block.get("tool_use_id")?.as_str()?.to_string();
            let is_error = block
                .get("is_error")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            Some(ToolResultBlock {
                tool_use_id,
                is_error,
            })
        })
        .collect()
}
