//! Opaque id newtypes.
//!
//! Zero-cost wrappers with `Display`/`From` impls, backed by `Uuid` rather
//! than a filesystem-derived string, since the canonical session identity
//! here is a database-issued UUID (spec.md §3, §9).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Canonical session identifier. UUID, never the owner-scoped external id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for SessionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for an authenticated or owning user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_roundtrips_through_display() {
        let id = Uuid::new_v4();
        let sid = SessionId::new(id);
        assert_eq!(sid.to_string(), id.to_string());
    }

    #[test]
    fn session_id_and_user_id_are_distinct_types() {
        let id = Uuid::new_v4();
        let sid = SessionId::new(id);
        let uid = UserId::new(id);
        assert_eq!(sid.as_uuid(), uid.as_uuid());
    }
}
