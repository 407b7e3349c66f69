//! Analytics card payload shapes (spec.md §3 "Analytics card", §4.3, §6).
//!
//! Each payload is an opaque JSON blob from the store's point of view, but
//! the serving layer and the computer need the same concrete shape, so it is
//! defined once here and reused by both `sessionhub-core` and
//! `sessionhub-web`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::SessionId;

/// Names of the cards every implementation must be able to produce
/// (spec.md §3, §4.3). Kept as a string enum (not a closed Rust enum) at the
/// wire boundary because `card_errors` keys by name and new cards are
/// additive, but used as a typed key internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardName {
    Tokens,
    Cost,
    Compaction,
    Tools,
    SmartRecap,
}

impl CardName {
    pub fn as_str(self) -> &'static str {
        match self {
            CardName::Tokens => "tokens",
            CardName::Cost => "cost",
            CardName::Compaction => "compaction",
            CardName::Tools => "tools",
            CardName::SmartRecap => "smart_recap",
        }
    }

    /// The non-smart-recap cards every request recomputes together on a
    /// cache miss (spec.md §4.4 "Cache miss policy").
    pub fn base_cards() -> [CardName; 4] {
        [
            CardName::Tokens,
            CardName::Cost,
            CardName::Compaction,
            CardName::Tools,
        ]
    }

    /// Current schema version for this card. Bumping invalidates every
    /// cached instance at any watermark (spec.md §3, §4.3 "Versioning").
    pub fn schema_version(self) -> i32 {
        match self {
            CardName::Tokens => 1,
            CardName::Cost => 1,
            CardName::Compaction => 1,
            CardName::Tools => 1,
            CardName::SmartRecap => 1,
        }
    }
}

/// `tokens` card payload (spec.md §4.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensCard {
    pub input: u64,
    pub output: u64,
    pub cache_creation: u64,
    pub cache_read: u64,
}

/// `cost` card payload. Deterministic function of token counts and the
/// fixed price table; never read from the transcript (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostCard {
    pub estimated_usd: f64,
    pub by_model: BTreeMap<String, f64>,
}

/// Compaction trigger classification (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompactionTrigger {
    Auto,
    Manual,
}

/// `compaction` card payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompactionCard {
    pub auto_count: u64,
    pub manual_count: u64,
    /// Average milliseconds between a compaction event and its logical
    /// parent event, when computable (spec.md §4.3).
    pub avg_ms_since_parent: Option<f64>,
}

/// Per-tool invocation counts (spec.md §4.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStat {
    pub success: u64,
    pub error: u64,
}

/// `tools` card payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolsCard {
    pub by_tool: BTreeMap<String, ToolStat>,
}

/// `smart_recap` card state as seen by a viewer (spec.md §3, §4.5, §4.10).
///
/// Serializes as either the full card object or `{"status": "generating"}`
/// (spec.md §6) — a hand-written `Serialize` impl rather than `#[serde(untagged)]`,
/// since untagged would serialize the unit variant as `null`, not the
/// `{"status": ...}` shape the response contract requires.
#[derive(Debug, Clone, PartialEq)]
pub enum SmartRecapStatus {
    Present(SmartRecapCard),
    Generating,
}

impl Serialize for SmartRecapStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            SmartRecapStatus::Present(card) => card.serialize(serializer),
            SmartRecapStatus::Generating => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("status", "generating")?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for SmartRecapStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.get("status").and_then(|s| s.as_str()) == Some("generating") {
            return Ok(SmartRecapStatus::Generating);
        }
        let card: SmartRecapCard =
            serde_json::from_value(value).map_err(serde::de::Error::custom)?;
        Ok(SmartRecapStatus::Present(card))
    }
}

/// `smart_recap` card payload once generated (spec.md §3, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartRecapCard {
    pub recap: String,
    pub went_well: Vec<String>,
    pub went_bad: Vec<String>,
    pub human_suggestions: Vec<String>,
    pub environment_suggestions: Vec<String>,
    pub default_context_suggestions: Vec<String>,
    pub model_used: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub generation_ms: u64,
    pub suggested_session_title: Option<String>,
    pub computed_at: DateTime<Utc>,
    pub up_to_line: u64,
}

/// Owner-only quota visibility (spec.md §4.5 step 2, §6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmartRecapQuotaView {
    pub used: u32,
    pub limit: u32,
    pub exceeded: bool,
}

/// `card_errors.<name>` surface (spec.md §6, §7).
pub type CardErrorMap = BTreeMap<String, String>;

/// A key identifying one cached card row: which session, which card, at
/// what watermark (spec.md §3 "Analytics card").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardKey {
    pub session: SessionId,
    pub card: CardName,
}
