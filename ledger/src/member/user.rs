//! Member identity and role types.
//!
//! Roles form a small ladder: WARGA are residents without fund membership,
//! MEMBER are paying participants, and TREASURER/ADMIN review proofs and
//! move money. The role on a [`User`] row is the single source of
//! authorization truth — there is no separate permission table.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::storage::db::KasDb;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Authorization role attached to every user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Resident without fund membership. May browse public summaries only.
    Warga,
    /// Paying fund member. May submit payment proofs.
    Member,
    /// Fund treasurer. Reviews proofs and records adjustments.
    Treasurer,
    /// Administrator. Everything a treasurer can do, plus membership review.
    Admin,
}

impl Role {
    /// Whether this role may review proofs, account requests, and perform
    /// ledger adjustments.
    pub fn can_review(self) -> bool {
        matches!(self, Role::Treasurer | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warga => write!(f, "WARGA"),
            Self::Member => write!(f, "MEMBER"),
            Self::Treasurer => write!(f, "TREASURER"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered member of the community fund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable user identifier.
    pub id: Uuid,
    /// Display name shown in listings and exports.
    pub full_name: String,
    /// Authorization role.
    pub role: Role,
}

impl User {
    /// Creates a user with a fresh id.
    pub fn new(full_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: full_name.into(),
            role,
        }
    }
}

// ---------------------------------------------------------------------------
// Reviewer Authorization
// ---------------------------------------------------------------------------

/// Failure modes of a reviewer check.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// The named reviewer does not exist.
    #[error("unknown reviewer: {0}")]
    UnknownReviewer(Uuid),

    /// The reviewer exists but lacks review privileges.
    #[error("forbidden: role {0} may not review")]
    Forbidden(Role),

    /// Storage failure while loading the reviewer.
    #[error(transparent)]
    Db(#[from] crate::storage::db::DbError),
}

/// Loads the acting user and verifies they may review.
///
/// Privileged workflows (proof approval, ledger adjustments, membership
/// review) call this first; everything it refuses maps to HTTP 403.
pub fn authorize_reviewer(db: &KasDb, reviewer_id: Uuid) -> Result<User, ReviewError> {
    let user = db
        .get_user(reviewer_id)?
        .ok_or(ReviewError::UnknownReviewer(reviewer_id))?;
    if !user.role.can_review() {
        return Err(ReviewError::Forbidden(user.role));
    }
    Ok(user)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_treasurer_and_admin_can_review() {
        assert!(!Role::Warga.can_review());
        assert!(!Role::Member.can_review());
        assert!(Role::Treasurer.can_review());
        assert!(Role::Admin.can_review());
    }

    #[test]
    fn role_serializes_in_screaming_snake_case() {
        // The wire format matches the database enum of the original schema.
        let json = serde_json::to_string(&Role::Treasurer).unwrap();
        assert_eq!(json, "\"TREASURER\"");
        let back: Role = serde_json::from_str("\"WARGA\"").unwrap();
        assert_eq!(back, Role::Warga);
    }

    #[test]
    fn authorize_reviewer_refuses_unknown_and_unprivileged() {
        let db = KasDb::open_temporary().unwrap();

        let ghost = Uuid::new_v4();
        assert!(matches!(
            authorize_reviewer(&db, ghost),
            Err(ReviewError::UnknownReviewer(id)) if id == ghost
        ));

        let member = User::new("Budi", Role::Member);
        db.put_user(&member).unwrap();
        assert!(matches!(
            authorize_reviewer(&db, member.id),
            Err(ReviewError::Forbidden(Role::Member))
        ));

        let treasurer = User::new("Sari", Role::Treasurer);
        db.put_user(&treasurer).unwrap();
        let ok = authorize_reviewer(&db, treasurer.id).unwrap();
        assert_eq!(ok.id, treasurer.id);
    }
}
