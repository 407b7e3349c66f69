//! Persisted domain entities (spec.md §3 "Data model").
//!
//! These mirror rows in the metadata store (`sessionhub-core::store::metadata`)
//! rather than transcript content — see `event_log` for the JSONL event
//! shapes the analytics computer consumes.

use chrono::{DateTime, Utc};
use sessionhub_types::{SessionId, UserId};

/// A session: the unit of upload, analytics, and sharing (spec.md §3 "Session").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    /// Client-chosen id used in the object-store key prefix. Unique per
    /// owner, not globally.
    pub external_id: String,
    pub owner_user_id: UserId,
    pub owner_active: bool,
    pub title: Option<String>,
}

/// `file_type` of a sync file (spec.md §3 "Sync file").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Transcript,
    Agent,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Transcript => "transcript",
            FileType::Agent => "agent",
        }
    }
}

/// `(session, filename, file_type, last_synced_line)` (spec.md §3 "Sync file").
///
/// `last_synced_line` is the monotonically non-decreasing watermark advanced
/// only by the upload path; the analytics pipeline treats it as read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFile {
    pub session: SessionId,
    pub filename: String,
    pub file_type: FileType,
    pub last_synced_line: u64,
}

/// An immutable byte-range chunk in the object store (spec.md §3 "Chunk").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkKey {
    pub user: UserId,
    pub external_id: String,
    pub filename: String,
    pub start: u64,
    pub end: u64,
}

impl ChunkKey {
    /// Object store key: `u/<user>/s/<external>/<filename>/<start>-<end>`.
    pub fn object_key(&self) -> String {
        format!(
            "u/{}/s/{}/{}/{}-{}",
            self.user, self.external_id, self.filename, self.start, self.end
        )
    }
}

/// `(session, is_public?, is_system?, expires_at?)` plus recipients
/// (spec.md §3 "Share").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub session: SessionId,
    pub is_public: bool,
    pub is_system: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked: bool,
    pub recipients: Vec<Recipient>,
}

impl Share {
    /// Active iff not revoked and (no expiry, or expiry in the future)
    /// (spec.md §3 "Share").
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at.map(|exp| exp > now).unwrap_or(true)
    }
}

/// A recipient entry on a share: `{email, resolved_user_id?}` (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub email: String,
    pub resolved_user_id: Option<UserId>,
}

/// `(owner_user, period, count)` monthly generation quota (spec.md §3 "Quota row").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaRow {
    pub owner_user: UserId,
    /// Calendar month in UTC, e.g. `(2026, 7)`.
    pub period: (i32, u32),
    pub count: u32,
}

impl QuotaRow {
    pub fn current_period(now: DateTime<Utc>) -> (i32, u32) {
        use chrono::Datelike;
        (now.year(), now.month())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn chunk_key_formats_object_store_path() {
        let key = ChunkKey {
            user: UserId::new(Uuid::nil()),
            external_id: "ext-1".into(),
            filename: "transcript.jsonl".into(),
            start: 0,
            end: 99,
        };
        assert_eq!(
            key.object_key(),
            format!("u/{}/s/ext-1/transcript.jsonl/0-99", Uuid::nil())
        );
    }

    #[test]
    fn share_with_no_expiry_is_active_when_not_revoked() {
        let share = Share {
            session: SessionId::new(Uuid::new_v4()),
            is_public: true,
            is_system: false,
            expires_at: None,
            revoked: false,
            recipients: vec![],
        };
        assert!(share.is_active(Utc::now()));
    }

    #[test]
    fn share_past_expiry_is_not_active() {
        let past = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let share = Share {
            session: SessionId::new(Uuid::new_v4()),
            is_public: true,
            is_system: false,
            expires_at: Some(past),
            revoked: false,
            recipients: vec![],
        };
        assert!(!share.is_active(Utc::now()));
    }

    #[test]
    fn revoked_share_is_never_active_regardless_of_expiry() {
        let share = Share {
            session: SessionId::new(Uuid::new_v4()),
            is_public: false,
            is_system: true,
            expires_at: None,
            revoked: true,
            recipients: vec![],
        };
        assert!(!share.is_active(Utc::now()));
    }
}
