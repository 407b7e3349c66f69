//! Access Resolver (spec.md §4.1).
//!
//! Pure function over already-loaded session/share rows: no I/O, no
//! caching (per spec.md §3 "Access info (derived, not stored)... Computed
//! per request; never cached"). Modeled as tagged-variant dispatch per
//! §9 Design Notes, the same way `MessageRole`/`DataEvent` are modeled as
//! plain enums elsewhere in this codebase.

use chrono::{DateTime, Utc};
use sessionhub_types::{AccessInfo, AccessType};

use crate::error::CoreError;
use crate::models::domain::{Session, Share};
use sessionhub_types::UserId;

/// `resolve(session_id, viewer_user_id?) → AccessInfo` (spec.md §4.1).
///
/// `session` and `shares` must already be loaded for the session in
/// question; this function only applies the precedence algorithm, so it can
/// be exercised in tests without a database.
pub fn resolve_access(
    session: &Session,
    shares: &[Share],
    viewer: Option<UserId>,
    now: DateTime<Utc>,
) -> Result<AccessInfo, CoreError> {
    if !session.owner_active {
        return Err(CoreError::OwnerInactive);
    }

    if let Some(viewer) = viewer {
        if viewer == session.owner_user_id {
            return Ok(AccessInfo::owner());
        }
    }

    let active_shares: Vec<&Share> = shares.iter().filter(|s| s.is_active(now)).collect();

    if let Some(viewer) = viewer {
        let is_recipient = active_shares.iter().any(|s| {
            s.recipients
                .iter()
                .any(|r| r.resolved_user_id == Some(viewer))
        });
        if is_recipient {
            return Ok(AccessInfo {
                access_type: AccessType::Recipient,
                auth_may_help: false,
                owner_active: true,
            });
        }

        if active_shares.iter().any(|s| s.is_system) {
            return Ok(AccessInfo {
                access_type: AccessType::System,
                auth_may_help: false,
                owner_active: true,
            });
        }
    }

    if active_shares.iter().any(|s| s.is_public) {
        return Ok(AccessInfo {
            access_type: AccessType::Public,
            auth_may_help: false,
            owner_active: true,
        });
    }

    // A system or recipient share exists that an unauthenticated (or
    // differently-authenticated) viewer might satisfy by signing in
    // (spec.md §4.1 step 5).
    let auth_may_help = active_shares
        .iter()
        .any(|s| s.is_system || !s.recipients.is_empty());

    Ok(AccessInfo::none(auth_may_help))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::Recipient;
    use sessionhub_types::SessionId;
    use uuid::Uuid;

    fn session(owner: UserId, owner_active: bool) -> Session {
        Session {
            id: SessionId::new(Uuid::new_v4()),
            external_id: "ext".into(),
            owner_user_id: owner,
            owner_active,
            title: None,
        }
    }

    #[test]
    fn owner_always_resolves_to_owner_access() {
        let owner = UserId::new(Uuid::new_v4());
        let sess = session(owner, true);
        let access = resolve_access(&sess, &[], Some(owner), Utc::now()).unwrap();
        assert_eq!(access.access_type, AccessType::Owner);
    }

    #[test]
    fn inactive_owner_blocks_everyone() {
        let owner = UserId::new(Uuid::new_v4());
        let sess = session(owner, false);
        let err = resolve_access(&sess, &[], Some(owner), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::OwnerInactive));
    }

    #[test]
    fn precedence_owner_recipient_system_public_none() {
        let owner = UserId::new(Uuid::new_v4());
        let recipient_user = UserId::new(Uuid::new_v4());
        let system_user = UserId::new(Uuid::new_v4());
        let sess = session(owner, true);
        let shares = vec![
            Share {
                session: sess.id,
                is_public: true,
                is_system: false,
                expires_at: None,
                revoked: false,
                recipients: vec![],
            },
            Share {
                session: sess.id,
                is_public: false,
                is_system: true,
                expires_at: None,
                revoked: false,
                recipients: vec![],
            },
            Share {
                session: sess.id,
                is_public: false,
                is_system: false,
                expires_at: None,
                revoked: false,
                recipients: vec![Recipient {
                    email: "b@example.com".into(),
                    resolved_user_id: Some(recipient_user),
                }],
            },
        ];

        assert_eq!(
            resolve_access(&sess, &shares, Some(owner), Utc::now())
                .unwrap()
                .access_type,
            AccessType::Owner
        );
        assert_eq!(
            resolve_access(&sess, &shares, Some(recipient_user), Utc::now())
                .unwrap()
                .access_type,
            AccessType::Recipient
        );
        assert_eq!(
            resolve_access(&sess, &shares, Some(system_user), Utc::now())
                .unwrap()
                .access_type,
            AccessType::System
        );
        assert_eq!(
            resolve_access(&sess, &shares, None, Utc::now()).unwrap().access_type,
            AccessType::Public
        );
    }

    #[test]
    fn none_access_sets_auth_may_help_when_system_share_exists() {
        let owner = UserId::new(Uuid::new_v4());
        let sess = session(owner, true);
        let shares = vec![Share {
            session: sess.id,
            is_public: false,
            is_system: true,
            expires_at: None,
            revoked: false,
            recipients: vec![],
        }];
        let access = resolve_access(&sess, &shares, None, Utc::now()).unwrap();
        assert_eq!(access.access_type, AccessType::None);
        assert!(access.auth_may_help);
    }

    #[test]
    fn expired_share_is_ignored() {
        use chrono::TimeZone;
        let owner = UserId::new(Uuid::new_v4());
        let sess = session(owner, true);
        let past = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let shares = vec![Share {
            session: sess.id,
            is_public: true,
            is_system: false,
            expires_at: Some(past),
            revoked: false,
            recipients: vec![],
        }];
        let access = resolve_access(&sess, &shares, None, Utc::now()).unwrap();
        assert_eq!(access.access_type, AccessType::None);
    }
}
