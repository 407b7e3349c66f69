//! Postgres-backed `CardCache` implementation.

use async_trait::async_trait;
use sessionhub_types::{CardName, SessionId};
use sqlx::PgPool;
use sqlx::Row;

use super::{CardCache, CardWrite, StoredCard, StoredCardSet};
use crate::error::StoreError;

/// Card cache backed by a `card_cache` table, one row per
/// `(session_id, card_name)` (spec.md §3 "Analytics card", §4.4).
pub struct PgCardCache {
    pool: PgPool,
}

impl PgCardCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_card_name(raw: &str) -> Option<CardName> {
    match raw {
        "tokens" => Some(CardName::Tokens),
        "cost" => Some(CardName::Cost),
        "compaction" => Some(CardName::Compaction),
        "tools" => Some(CardName::Tools),
        "smart_recap" => Some(CardName::SmartRecap),
        _ => None,
    }
}

#[async_trait]
impl CardCache for PgCardCache {
    async fn get(&self, session: SessionId) -> Result<StoredCardSet, StoreError> {
        let rows = sqlx::query(
            "SELECT card_name, schema_version, up_to_line, payload, computed_at
             FROM card_cache WHERE session_id = $1",
        )
        .bind(session.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut out = StoredCardSet::new();
        for row in rows {
            let card_name: String = row.try_get("card_name")?;
            let Some(card) = parse_card_name(&card_name) else {
                continue;
            };
            let up_to_line: i64 = row.try_get("up_to_line")?;
            out.insert(
                card,
                StoredCard {
                    schema_version: row.try_get("schema_version")?,
                    up_to_line: up_to_line as u64,
                    payload: row.try_get("payload")?,
                    computed_at: row.try_get("computed_at")?,
                },
            );
        }
        Ok(out)
    }

    async fn upsert(&self, session: SessionId, cards: &[CardWrite]) -> Result<(), StoreError> {
        // Per-card atomic replace (spec.md §4.4): no cross-card transaction,
        // each card's write stands alone. The WHERE clause on the conflict
        // action enforces the monotonic up_to_line invariant: a write with a
        // smaller up_to_line than the stored row is a silent no-op rather
        // than a regression.
        for card in cards {
            sqlx::query(
                "INSERT INTO card_cache (session_id, card_name, schema_version, up_to_line, payload, computed_at)
                 VALUES ($1, $2, $3, $4, $5, now())
                 ON CONFLICT (session_id, card_name) DO UPDATE
                 SET schema_version = EXCLUDED.schema_version,
                     up_to_line = EXCLUDED.up_to_line,
                     payload = EXCLUDED.payload,
                     computed_at = EXCLUDED.computed_at
                 WHERE EXCLUDED.up_to_line >= card_cache.up_to_line",
            )
            .bind(session.as_uuid())
            .bind(card.card.as_str())
            .bind(card.schema_version)
            .bind(card.up_to_line as i64)
            .bind(&card.payload)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}
