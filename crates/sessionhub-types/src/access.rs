//! Access classification shared between the resolver (core) and the HTTP
//! surface (web), so status-code mapping never has to guess at variants.
//!
//! Modeled as a tagged variant per §9 Design Notes ("Model access as a tagged
//! variant... dispatch via pattern matching, not inheritance"), the same way
//! `MessageRole` / `DataEvent` are modeled as plain enums elsewhere in this
//! codebase.

use serde::{Deserialize, Serialize};

/// The classified permission level of a viewer on a session (spec.md §3, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessType {
    Owner,
    Recipient,
    System,
    Public,
    None,
}

impl AccessType {
    pub fn has_access(self) -> bool {
        !matches!(self, AccessType::None)
    }

    pub fn is_owner(self) -> bool {
        matches!(self, AccessType::Owner)
    }
}

/// Outcome of access resolution (spec.md §3 "Access info (derived, not stored)").
///
/// Never cached: computed fresh per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessInfo {
    pub access_type: AccessType,
    /// True iff signing in could upgrade a `None` result (system/recipient
    /// share exists that the anonymous viewer might satisfy).
    pub auth_may_help: bool,
    /// True iff the session owner's account is active. An inactive owner
    /// blocks all access regardless of share type (spec.md §4.1).
    pub owner_active: bool,
}

impl AccessInfo {
    pub fn owner() -> Self {
        Self {
            access_type: AccessType::Owner,
            auth_may_help: false,
            owner_active: true,
        }
    }

    pub fn none(auth_may_help: bool) -> Self {
        Self {
            access_type: AccessType::None,
            auth_may_help,
            owner_active: true,
        }
    }
}

/// Privacy projection applied to session detail fields (spec.md §4.1).
///
/// Owners see `hostname`, `username`, and a custom title; every other access
/// type sees these fields as absent. Represented as a mask rather than a
/// second struct so a single `SessionDetail` type can serialize either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldMask {
    pub show_owner_only_fields: bool,
}

impl FieldMask {
    pub fn for_access(access: AccessType) -> Self {
        Self {
            show_owner_only_fields: access.is_owner(),
        }
    }
}
