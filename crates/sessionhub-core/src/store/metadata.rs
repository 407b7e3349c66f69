//! Metadata Store Adapter (spec.md §4.8).
//!
//! Exposes exactly the operations the core needs: session/share/recipient
//! lookups, smart-recap card + lock, and quota rows. Lock and quota
//! operations are single-statement conditional updates, never
//! read-modify-write in application code (spec.md §4.8 "must be atomic").
//!
//! No pack example uses `sqlx`; this adapter is grounded on
//! `arkCyber-Matrixon`'s workspace dependency table (postgres + chrono +
//! uuid feature set), the closest pack example to a multi-tenant Postgres
//! backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sessionhub_types::{AccessInfo, FieldMask, SessionId, SmartRecapCard, UserId};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::access::resolve_access;
use crate::error::CoreError;
use crate::models::domain::{QuotaRow, Recipient, Session, Share, SyncFile};

/// Session detail with the owner-only field mask already applied
/// (spec.md §4.1 "Privacy projection").
#[derive(Debug, Clone)]
pub struct SessionDetail {
    pub session: Session,
    pub mask: FieldMask,
    pub hostname: Option<String>,
    pub username: Option<String>,
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_session_access_type(
        &self,
        session: SessionId,
        viewer: Option<UserId>,
    ) -> Result<AccessInfo, CoreError>;

    async fn get_session_detail_with_access(
        &self,
        session: SessionId,
        access: AccessInfo,
    ) -> Result<SessionDetail, CoreError>;

    async fn get_session_owner_and_external_id(
        &self,
        session: SessionId,
    ) -> Result<(UserId, String), CoreError>;

    async fn get_sync_files(&self, session: SessionId) -> Result<Vec<SyncFile>, CoreError>;

    async fn get_smart_recap_card(
        &self,
        session: SessionId,
    ) -> Result<Option<SmartRecapCard>, CoreError>;

    async fn upsert_smart_recap_card(
        &self,
        session: SessionId,
        card: &SmartRecapCard,
    ) -> Result<(), CoreError>;

    /// Compare-and-set the generation lock: succeeds iff no row exists or
    /// the existing `locked_at` is older than `timeout` (spec.md §4.5 step 5).
    async fn acquire_smart_recap_lock(
        &self,
        session: SessionId,
        timeout: Duration,
        token: &str,
    ) -> Result<bool, CoreError>;

    async fn clear_smart_recap_lock(&self, session: SessionId) -> Result<(), CoreError>;

    async fn get_or_create_smart_recap_quota(&self, owner: UserId) -> Result<QuotaRow, CoreError>;

    /// Resets `count` to 0 iff the stored period is earlier than the
    /// current UTC month (spec.md §4.5 step 1).
    async fn reset_smart_recap_quota_if_needed(
        &self,
        owner: UserId,
    ) -> Result<QuotaRow, CoreError>;

    async fn increment_smart_recap_quota(&self, owner: UserId) -> Result<(), CoreError>;

    async fn update_session_suggested_title(
        &self,
        session: SessionId,
        title: &str,
    ) -> Result<(), CoreError>;

    /// Records why the last generation for `session` failed, so the next
    /// request can surface it via `card_errors.smart_recap` (spec.md §4.5
    /// step 6 "the error is surfaced to the next request").
    async fn record_smart_recap_failure(
        &self,
        session: SessionId,
        message: &str,
    ) -> Result<(), CoreError>;

    /// Reads and clears the last recorded failure, if any.
    async fn take_smart_recap_failure(&self, session: SessionId) -> Result<Option<String>, CoreError>;
}

pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_session(&self, session: SessionId) -> Result<Session, CoreError> {
        let row = sqlx::query(
            "SELECT id, external_id, owner_user_id, owner_active, title
             FROM sessions WHERE id = $1",
        )
        .bind(session.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::error::StoreError::Database)?
        .ok_or_else(|| CoreError::NotFound(session.to_string()))?;

        Ok(Session {
            id: SessionId::new(row.try_get("id").map_err(crate::error::StoreError::Database)?),
            external_id: row
                .try_get("external_id")
                .map_err(crate::error::StoreError::Database)?,
            owner_user_id: UserId::new(
                row.try_get("owner_user_id")
                    .map_err(crate::error::StoreError::Database)?,
            ),
            owner_active: row
                .try_get("owner_active")
                .map_err(crate::error::StoreError::Database)?,
            title: row.try_get("title").map_err(crate::error::StoreError::Database)?,
        })
    }

    async fn load_shares(&self, session: SessionId) -> Result<Vec<Share>, CoreError> {
        let rows = sqlx::query(
            "SELECT id, is_public, is_system, expires_at, revoked
             FROM shares WHERE session_id = $1",
        )
        .bind(session.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::StoreError::Database)?;

        let mut shares = Vec::with_capacity(rows.len());
        for row in rows {
            let share_id: uuid::Uuid = row.try_get("id").map_err(crate::error::StoreError::Database)?;
            let recipients = self.load_recipients(share_id).await?;
            shares.push(Share {
                session,
                is_public: row.try_get("is_public").map_err(crate::error::StoreError::Database)?,
                is_system: row.try_get("is_system").map_err(crate::error::StoreError::Database)?,
                expires_at: row
                    .try_get("expires_at")
                    .map_err(crate::error::StoreError::Database)?,
                revoked: row.try_get("revoked").map_err(crate::error::StoreError::Database)?,
                recipients,
            });
        }
        Ok(shares)
    }

    async fn load_recipients(&self, share_id: uuid::Uuid) -> Result<Vec<Recipient>, CoreError> {
        let rows = sqlx::query(
            "SELECT email, resolved_user_id
             FROM share_recipients WHERE share_id = $1",
        )
        .bind(share_id)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::StoreError::Database)?;

        let mut recipients = Vec::with_capacity(rows.len());
        for row in rows {
            let resolved_user_id: Option<uuid::Uuid> = row
                .try_get("resolved_user_id")
                .map_err(crate::error::StoreError::Database)?;
            recipients.push(Recipient {
                email: row.try_get("email").map_err(crate::error::StoreError::Database)?,
                resolved_user_id: resolved_user_id.map(UserId::new),
            });
        }
        Ok(recipients)
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn get_session_access_type(
        &self,
        session: SessionId,
        viewer: Option<UserId>,
    ) -> Result<AccessInfo, CoreError> {
        let sess = self.load_session(session).await?;
        let shares = self.load_shares(session).await?;
        resolve_access(&sess, &shares, viewer, Utc::now())
    }

    async fn get_session_detail_with_access(
        &self,
        session: SessionId,
        access: AccessInfo,
    ) -> Result<SessionDetail, CoreError> {
        let sess = self.load_session(session).await?;
        let mask = FieldMask::for_access(access.access_type);
        let (hostname, username) = if mask.show_owner_only_fields {
            let row = sqlx::query("SELECT hostname, username FROM sessions WHERE id = $1")
                .bind(session.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(crate::error::StoreError::Database)?;
            match row {
                Some(r) => (
                    r.try_get("hostname").map_err(crate::error::StoreError::Database)?,
                    r.try_get("username").map_err(crate::error::StoreError::Database)?,
                ),
                None => (None, None),
            }
        } else {
            (None, None)
        };

        Ok(SessionDetail {
            session: sess,
            mask,
            hostname,
            username,
        })
    }

    async fn get_session_owner_and_external_id(
        &self,
        session: SessionId,
    ) -> Result<(UserId, String), CoreError> {
        let sess = self.load_session(session).await?;
        Ok((sess.owner_user_id, sess.external_id))
    }

    async fn get_sync_files(&self, session: SessionId) -> Result<Vec<SyncFile>, CoreError> {
        let rows = sqlx::query(
            "SELECT filename, file_type, last_synced_line
             FROM sync_files WHERE session_id = $1",
        )
        .bind(session.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::StoreError::Database)?;

        let mut files = Vec::with_capacity(rows.len());
        for row in rows {
            let file_type: String =
                row.try_get("file_type").map_err(crate::error::StoreError::Database)?;
            let last_synced_line: i64 = row
                .try_get("last_synced_line")
                .map_err(crate::error::StoreError::Database)?;
            files.push(SyncFile {
                session,
                filename: row.try_get("filename").map_err(crate::error::StoreError::Database)?,
                file_type: if file_type == "transcript" {
                    crate::models::domain::FileType::Transcript
                } else {
                    crate::models::domain::FileType::Agent
                },
                last_synced_line: last_synced_line as u64,
            });
        }
        Ok(files)
    }

    async fn get_smart_recap_card(
        &self,
        session: SessionId,
    ) -> Result<Option<SmartRecapCard>, CoreError> {
        let row = sqlx::query(
            "SELECT payload FROM smart_recap_cards WHERE session_id = $1",
        )
        .bind(session.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::error::StoreError::Database)?;

        match row {
            None => Ok(None),
            Some(row) => {
                let payload: serde_json::Value =
                    row.try_get("payload").map_err(crate::error::StoreError::Database)?;
                let card: SmartRecapCard = serde_json::from_value(payload)
                    .map_err(|e| CoreError::CorruptTranscript(e.to_string()))?;
                Ok(Some(card))
            }
        }
    }

    async fn upsert_smart_recap_card(
        &self,
        session: SessionId,
        card: &SmartRecapCard,
    ) -> Result<(), CoreError> {
        let payload = serde_json::to_value(card)
            .map_err(|e| CoreError::Internal(anyhow::anyhow!(e)))?;
        sqlx::query(
            "INSERT INTO smart_recap_cards (session_id, payload, up_to_line)
             VALUES ($1, $2, $3)
             ON CONFLICT (session_id) DO UPDATE
             SET payload = EXCLUDED.payload, up_to_line = EXCLUDED.up_to_line
             WHERE EXCLUDED.up_to_line >= smart_recap_cards.up_to_line",
        )
        .bind(session.as_uuid())
        .bind(&payload)
        .bind(card.up_to_line as i64)
        .execute(&self.pool)
        .await
        .map_err(crate::error::StoreError::Database)?;
        Ok(())
    }

    async fn acquire_smart_recap_lock(
        &self,
        session: SessionId,
        timeout: Duration,
        token: &str,
    ) -> Result<bool, CoreError> {
        let timeout_secs = timeout.as_secs_f64();
        let result = sqlx::query(
            "INSERT INTO smart_recap_locks (session_id, locked_at, locked_by)
             VALUES ($1, now(), $2)
             ON CONFLICT (session_id) DO UPDATE
             SET locked_at = now(), locked_by = EXCLUDED.locked_by
             WHERE smart_recap_locks.locked_at < now() - ($3 * interval '1 second')",
        )
        .bind(session.as_uuid())
        .bind(token)
        .bind(timeout_secs)
        .execute(&self.pool)
        .await
        .map_err(crate::error::StoreError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_smart_recap_lock(&self, session: SessionId) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM smart_recap_locks WHERE session_id = $1")
            .bind(session.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(crate::error::StoreError::Database)?;
        Ok(())
    }

    async fn get_or_create_smart_recap_quota(&self, owner: UserId) -> Result<QuotaRow, CoreError> {
        let now = Utc::now();
        let (year, month) = QuotaRow::current_period(now);
        let row = sqlx::query(
            "INSERT INTO smart_recap_quotas (owner_user_id, period_year, period_month, count)
             VALUES ($1, $2, $3, 0)
             ON CONFLICT (owner_user_id) DO UPDATE SET owner_user_id = EXCLUDED.owner_user_id
             RETURNING period_year, period_month, count",
        )
        .bind(owner.as_uuid())
        .bind(year)
        .bind(month as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(crate::error::StoreError::Database)?;

        Ok(QuotaRow {
            owner_user: owner,
            period: (
                row.try_get("period_year").map_err(crate::error::StoreError::Database)?,
                row.try_get::<i32, _>("period_month")
                    .map_err(crate::error::StoreError::Database)? as u32,
            ),
            count: row.try_get::<i32, _>("count").map_err(crate::error::StoreError::Database)? as u32,
        })
    }

    async fn reset_smart_recap_quota_if_needed(
        &self,
        owner: UserId,
    ) -> Result<QuotaRow, CoreError> {
        let now = Utc::now();
        let (year, month) = QuotaRow::current_period(now);
        sqlx::query(
            "UPDATE smart_recap_quotas SET count = 0, period_year = $2, period_month = $3
             WHERE owner_user_id = $1
               AND (period_year < $2 OR (period_year = $2 AND period_month < $3))",
        )
        .bind(owner.as_uuid())
        .bind(year)
        .bind(month as i32)
        .execute(&self.pool)
        .await
        .map_err(crate::error::StoreError::Database)?;

        self.get_or_create_smart_recap_quota(owner).await
    }

    async fn increment_smart_recap_quota(&self, owner: UserId) -> Result<(), CoreError> {
        sqlx::query(
            "UPDATE smart_recap_quotas SET count = count + 1 WHERE owner_user_id = $1",
        )
        .bind(owner.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(crate::error::StoreError::Database)?;
        Ok(())
    }

    async fn update_session_suggested_title(
        &self,
        session: SessionId,
        title: &str,
    ) -> Result<(), CoreError> {
        sqlx::query("UPDATE sessions SET title = $2 WHERE id = $1")
            .bind(session.as_uuid())
            .bind(title)
            .execute(&self.pool)
            .await
            .map_err(crate::error::StoreError::Database)?;
        Ok(())
    }

    async fn record_smart_recap_failure(
        &self,
        session: SessionId,
        message: &str,
    ) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO smart_recap_errors (session_id, message)
             VALUES ($1, $2)
             ON CONFLICT (session_id) DO UPDATE SET message = EXCLUDED.message",
        )
        .bind(session.as_uuid())
        .bind(message)
        .execute(&self.pool)
        .await
        .map_err(crate::error::StoreError::Database)?;
        Ok(())
    }

    async fn take_smart_recap_failure(&self, session: SessionId) -> Result<Option<String>, CoreError> {
        let row = sqlx::query("DELETE FROM smart_recap_errors WHERE session_id = $1 RETURNING message")
            .bind(session.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(crate::error::StoreError::Database)?;
        match row {
            None => Ok(None),
            Some(row) => Ok(Some(
                row.try_get("message").map_err(crate::error::StoreError::Database)?,
            )),
        }
    }
}
