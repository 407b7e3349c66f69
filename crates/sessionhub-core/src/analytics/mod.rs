//! Analytics Computer (spec.md §4.3).
//!
//! `compute` is a pure, single-pass function of a transcript's events (plus
//! any agent files keyed by agent id) to a `CardSet`. No I/O, no clock reads
//! beyond what's present in the events themselves — byte-identical output
//! for byte-identical input, which is what makes the card cache's
//! watermark-keyed rows safe to reuse across requests.

use std::collections::{BTreeMap, HashMap};

use sessionhub_types::{CompactionCard, CompactionTrigger, CostCard, ToolStat, ToolsCard, TokensCard};

use crate::models::event_log::{extract_tool_result_blocks, extract_tool_use_blocks, SessionLine};
use crate::pricing::calculate_cost;

/// The non-smart-recap cards produced by one `compute` call (spec.md §4.3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardSet {
    pub tokens: TokensCard,
    pub cost: CostCard,
    pub compaction: CompactionCard,
    pub tools: ToolsCard,
    /// Non-fatal parse issues seen while building this card set, surfaced by
    /// the assembler (spec.md §4.2, §4.3 "validation_error_count").
    pub validation_error_count: u64,
}

/// Compute the base card set from a transcript's events and its agent
/// files, keyed by agent id (spec.md §4.3 `compute`).
///
/// Agent events currently contribute to the same aggregate cards as the
/// main transcript rather than separate per-agent card rows, so the agent
/// id key is retained on the input for future per-agent breakdowns but
/// folded into the session-wide totals here.
pub fn compute(
    transcript_events: &[SessionLine],
    agent_events_by_id: &HashMap<String, Vec<SessionLine>>,
) -> CardSet {
    let mut tokens = TokensCard::default();
    let mut cost_by_model: BTreeMap<String, f64> = BTreeMap::new();
    let mut auto_count = 0u64;
    let mut manual_count = 0u64;
    let mut compaction_gaps_ms: Vec<f64> = Vec::new();
    let mut by_tool: BTreeMap<String, ToolStat> = BTreeMap::new();

    let mut uuid_timestamps: HashMap<String, chrono::DateTime<chrono::Utc>> = HashMap::new();
    let mut tool_use_names: HashMap<String, String> = HashMap::new();

    let all_events = transcript_events
        .iter()
        .chain(agent_events_by_id.values().flatten());

    // First pass: index uuid -> timestamp and tool_use id -> name, since a
    // compaction event's logical parent or a tool_result's matching call may
    // appear earlier in the stream.
    for event in all_events.clone() {
        if let (Some(uuid), Some(ts)) = (&event.uuid, event.timestamp) {
            uuid_timestamps.insert(uuid.clone(), ts);
        }
        if let Some(message) = &event.message {
            if let Some(content) = &message.content {
                for block in extract_tool_use_blocks(content) {
                    tool_use_names.insert(block.id, block.name);
                }
            }
        }
    }

    for event in all_events {
        // Tool results arrive on whichever event carries them in the real
        // on-wire format: a `tool_use` is issued by an `"assistant"` event,
        // but its matching `tool_result` comes back on the subsequent
        // `"user"` event, not the assistant one. Check every event's content
        // blocks regardless of `line_type` so both shapes are covered.
        if let Some(message) = &event.message {
            if let Some(content) = &message.content {
                for block in extract_tool_result_blocks(content) {
                    let name = tool_use_names
                        .get(&block.tool_use_id)
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string());
                    let stat = by_tool.entry(name).or_default();
                    if block.is_error {
                        stat.error += 1;
                    } else {
                        stat.success += 1;
                    }
                }
            }
        }

        match event.line_type.as_str() {
            "assistant" => {
                let usage = event
                    .message
                    .as_ref()
                    .and_then(|m| m.usage)
                    .or(event.usage)
                    .unwrap_or_default();

                tokens.input += usage.input_tokens;
                tokens.output += usage.output_tokens;
                tokens.cache_creation += usage.cache_write_tokens;
                tokens.cache_read += usage.cache_read_tokens;

                let model = event.model.clone().unwrap_or_else(|| "unknown".to_string());
                let cost = calculate_cost(
                    &model,
                    usage.input_tokens,
                    usage.output_tokens,
                    usage.cache_write_tokens,
                    usage.cache_read_tokens,
                );
                *cost_by_model.entry(model).or_insert(0.0) += cost;
            }
            "system" if event.subtype.as_deref() == Some("compact_boundary") => {
                let trigger = event
                    .compact_metadata
                    .as_ref()
                    .and_then(|m| m.trigger.as_deref());
                match trigger {
                    Some("manual") => manual_count += 1,
                    _ => auto_count += 1,
                }

                if let (Some(parent_uuid), Some(ts)) = (&event.logical_parent_uuid, event.timestamp)
                {
                    if let Some(parent_ts) = uuid_timestamps.get(parent_uuid) {
                        let delta_ms = (ts - *parent_ts).num_milliseconds() as f64;
                        compaction_gaps_ms.push(delta_ms.abs());
                    }
                }
            }
            _ => {}
        }
    }

    let estimated_usd = cost_by_model.values().sum();
    let avg_ms_since_parent = if compaction_gaps_ms.is_empty() {
        None
    } else {
        Some(compaction_gaps_ms.iter().sum::<f64>() / compaction_gaps_ms.len() as f64)
    };

    CardSet {
        tokens,
        cost: CostCard {
            estimated_usd,
            by_model: cost_by_model,
        },
        compaction: CompactionCard {
            auto_count,
            manual_count,
            avg_ms_since_parent,
        },
        tools: ToolsCard { by_tool },
        validation_error_count: 0,
    }
}

/// Re-exported so callers can classify a compaction trigger without
/// reaching into `sessionhub_types` directly.
pub type Trigger = CompactionTrigger;
