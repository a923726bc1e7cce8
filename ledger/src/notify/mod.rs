//! # Notification Module
//!
//! Lightweight read/unread notices. Workflows emit them at the moments a
//! member or administrator would want to glance at the app: a proof
//! entered the queue, a deposit was settled, someone asked to join.
//!
//! A notification is addressed either to one user (`user_id`) or to the
//! whole review staff (`for_admin`), never both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::NOTIFICATION_PAGE_LIMIT;
use crate::storage::db::{DbError, KasDb};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What a notification announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// A member submitted a payment proof (admin feed).
    ProofSubmitted,
    /// A member's proof was approved (member feed).
    ProofApproved,
    /// A member's proof was rejected (member feed).
    ProofRejected,
    /// Someone asked for an account (admin feed).
    RequestSubmitted,
}

/// A single notice with a read flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// Addressee, when the notice targets one member.
    pub user_id: Option<Uuid>,
    /// Whether the notice goes to the admin feed instead.
    pub for_admin: bool,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Whose feed to read or mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationScope {
    /// One member's notices.
    User(Uuid),
    /// The shared admin feed.
    Admin,
}

impl NotificationScope {
    fn matches(self, n: &Notification) -> bool {
        match self {
            Self::User(id) => n.user_id == Some(id),
            Self::Admin => n.for_admin,
        }
    }
}

/// A feed page: newest first, plus the unread count for the badge.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationFeed {
    pub items: Vec<Notification>,
    pub unread: usize,
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

fn emit(db: &KasDb, notification: Notification) -> Result<(), DbError> {
    db.put_notification(&notification)
}

/// Emits a notice to one member's feed.
pub fn notify_user(
    db: &KasDb,
    user_id: Uuid,
    kind: NotificationKind,
    title: &str,
    body: &str,
) -> Result<(), DbError> {
    emit(
        db,
        Notification {
            id: Uuid::new_v4(),
            kind,
            title: title.to_string(),
            body: body.to_string(),
            user_id: Some(user_id),
            for_admin: false,
            is_read: false,
            created_at: Utc::now(),
        },
    )
}

/// Emits a notice to the shared admin feed.
pub fn notify_admins(
    db: &KasDb,
    kind: NotificationKind,
    title: &str,
    body: &str,
) -> Result<(), DbError> {
    emit(
        db,
        Notification {
            id: Uuid::new_v4(),
            kind,
            title: title.to_string(),
            body: body.to_string(),
            user_id: None,
            for_admin: true,
            is_read: false,
            created_at: Utc::now(),
        },
    )
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Reads a feed: scope-filtered, newest first, capped at
/// [`NOTIFICATION_PAGE_LIMIT`]. The unread count covers the returned page.
pub fn list(db: &KasDb, scope: NotificationScope) -> Result<NotificationFeed, DbError> {
    let items: Vec<Notification> = db
        .list_notifications_desc()?
        .into_iter()
        .filter(|n| scope.matches(n))
        .take(NOTIFICATION_PAGE_LIMIT)
        .collect();
    let unread = items.iter().filter(|n| !n.is_read).count();
    Ok(NotificationFeed { items, unread })
}

/// Marks every unread notice in the scope as read. Returns how many
/// flipped.
pub fn mark_all_read(db: &KasDb, scope: NotificationScope) -> Result<u64, DbError> {
    let mut flipped = 0;
    for mut n in db.list_notifications_desc()? {
        if scope.matches(&n) && !n.is_read {
            n.is_read = true;
            db.put_notification(&n)?;
            flipped += 1;
        }
    }
    Ok(flipped)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feeds_are_scoped() {
        let db = KasDb::open_temporary().unwrap();
        let budi = Uuid::new_v4();
        let sari = Uuid::new_v4();

        notify_user(&db, budi, NotificationKind::ProofApproved, "ok", "credited").unwrap();
        notify_user(&db, sari, NotificationKind::ProofRejected, "no", "blurry").unwrap();
        notify_admins(&db, NotificationKind::ProofSubmitted, "new", "queue grew").unwrap();

        let budi_feed = list(&db, NotificationScope::User(budi)).unwrap();
        assert_eq!(budi_feed.items.len(), 1);
        assert_eq!(budi_feed.items[0].kind, NotificationKind::ProofApproved);

        let admin_feed = list(&db, NotificationScope::Admin).unwrap();
        assert_eq!(admin_feed.items.len(), 1);
        assert!(admin_feed.items[0].for_admin);
    }

    #[test]
    fn feed_is_newest_first_with_unread_count() {
        let db = KasDb::open_temporary().unwrap();
        let user = Uuid::new_v4();
        for i in 0..3 {
            notify_user(
                &db,
                user,
                NotificationKind::ProofApproved,
                &format!("t{i}"),
                "b",
            )
            .unwrap();
        }

        let feed = list(&db, NotificationScope::User(user)).unwrap();
        assert_eq!(feed.unread, 3);
        assert!(feed
            .items
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn mark_all_read_flips_only_the_scope() {
        let db = KasDb::open_temporary().unwrap();
        let user = Uuid::new_v4();
        notify_user(&db, user, NotificationKind::ProofApproved, "a", "b").unwrap();
        notify_admins(&db, NotificationKind::RequestSubmitted, "c", "d").unwrap();

        let flipped = mark_all_read(&db, NotificationScope::User(user)).unwrap();
        assert_eq!(flipped, 1);
        assert_eq!(list(&db, NotificationScope::User(user)).unwrap().unread, 0);
        assert_eq!(list(&db, NotificationScope::Admin).unwrap().unread, 1);

        // Idempotent: nothing left to flip.
        assert_eq!(mark_all_read(&db, NotificationScope::User(user)).unwrap(), 0);
    }
}
