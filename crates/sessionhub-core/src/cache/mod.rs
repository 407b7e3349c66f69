//! Card Cache (spec.md §4.4).
//!
//! Write-through store for non-smart-recap analytics cards, keyed by
//! `(session, card_name)` with a monotonic `up_to_line` watermark.
//! Uses the same schema-version invalidation idea as a local SQLite
//! metadata cache (a `CACHE_VERSION` bump forces recompute), but backed by
//! Postgres since the metadata store here is shared across server
//! instances rather than a single process's local cache.

pub mod postgres;

pub use postgres::PgCardCache;

use async_trait::async_trait;
use sessionhub_types::{CardName, SessionId};
use std::collections::BTreeMap;

use crate::error::StoreError;

/// One stored card row as seen by the cache, independent of payload shape
/// (spec.md §3 "Analytics card").
#[derive(Debug, Clone)]
pub struct StoredCard {
    pub schema_version: i32,
    pub up_to_line: u64,
    pub payload: serde_json::Value,
    pub computed_at: chrono::DateTime<chrono::Utc>,
}

/// Everything cached for a session, keyed by card name (spec.md §4.4 `get`).
pub type StoredCardSet = BTreeMap<CardName, StoredCard>;

/// A card to write in an `upsert` call (spec.md §4.4 `upsert`).
#[derive(Debug, Clone)]
pub struct CardWrite {
    pub card: CardName,
    pub schema_version: i32,
    pub up_to_line: u64,
    pub payload: serde_json::Value,
}

/// Card Cache operations (spec.md §4.4).
#[async_trait]
pub trait CardCache: Send + Sync {
    async fn get(&self, session: SessionId) -> Result<StoredCardSet, StoreError>;

    /// Per-card atomic replace; no cross-card transaction, since cards are
    /// independently re-derivable on a subsequent miss (spec.md §4.4).
    async fn upsert(&self, session: SessionId, cards: &[CardWrite]) -> Result<(), StoreError>;
}

/// `all_valid(cards, watermark)`: true iff every card in `required` is
/// present in `cards` with a matching schema version and
/// `up_to_line == watermark` (spec.md §4.4).
pub fn all_valid(cards: &StoredCardSet, required: &[CardName], watermark: u64) -> bool {
    required.iter().all(|name| {
        cards
            .get(name)
            .map(|stored| {
                stored.schema_version == name.schema_version() && stored.up_to_line == watermark
            })
            .unwrap_or(false)
    })
}
