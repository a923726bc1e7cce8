//! The proof review workflow: submit, approve, reject, and the pending
//! queue.
//!
//! The invariant this module exists to uphold: an APPROVED proof has
//! exactly one ledger entry, keyed by its proof id. Both the PENDING
//! status check and the entry upsert run under the database write guard,
//! so two racing approvals resolve to one booked entry and one refusal.

use chrono::Utc;
use uuid::Uuid;

use super::types::{normalize_checksum, PaymentProof, ProofStatus};
use crate::ledger::entry::{EntryKind, EntrySource, LedgerEntry};
use crate::member::{authorize_reviewer, ReviewError};
use crate::notify::{self, NotificationKind};
use crate::storage::db::{DbError, KasDb};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for a new proof submission.
#[derive(Debug, Clone)]
pub struct NewProof {
    /// The submitting member.
    pub user_id: Uuid,
    /// Claimed amount, if the member filled it in.
    pub amount: Option<i64>,
    /// When the transfer happened, per the member.
    pub transfer_at: Option<chrono::DateTime<Utc>>,
    /// Sending bank.
    pub bank_name: Option<String>,
    /// Last four digits of the sending account.
    pub account_last4: Option<String>,
    /// Storage path of the uploaded screenshot.
    pub screenshot_path: String,
    /// SHA-256 hex of the screenshot bytes.
    pub checksum: String,
}

/// A pending proof joined with its member's display name, for the review
/// queue.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PendingProof {
    #[serde(flatten)]
    pub proof: PaymentProof,
    pub member_name: String,
}

/// Errors that can occur in the proof workflow.
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    /// The claimed amount is zero or negative.
    #[error("invalid amount: must be a positive number")]
    InvalidAmount,

    /// The checksum is not 64 hex characters.
    #[error("invalid checksum: expected 64 hex characters")]
    InvalidChecksum,

    /// The evidence reference is missing.
    #[error("missing screenshot reference")]
    MissingScreenshot,

    /// Another proof already carries this checksum.
    #[error("duplicate proof: checksum {0} was already submitted")]
    DuplicateChecksum(String),

    /// The submitting user does not exist.
    #[error("unknown user: {0}")]
    UnknownUser(Uuid),

    /// No proof with the given id exists.
    #[error("proof not found: {0}")]
    NotFound(Uuid),

    /// The proof has left PENDING and cannot be approved.
    #[error("proof is not PENDING (status: {0})")]
    NotPending(ProofStatus),

    /// The proof is already REJECTED; rejection is terminal.
    #[error("proof is already REJECTED")]
    AlreadyRejected,

    /// The proof has no usable amount to book.
    #[error("amount missing: supply one to approve this proof")]
    AmountMissing,

    /// The acting user may not review proofs.
    #[error(transparent)]
    Review(#[from] ReviewError),

    /// Storage failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Submits a new payment proof as PENDING.
///
/// Validates the claimed amount and the checksum shape, refuses checksums
/// that any earlier proof already used (regardless of that proof's
/// status), and notifies administrators that the queue grew.
pub fn submit_proof(db: &KasDb, input: NewProof) -> Result<PaymentProof, ProofError> {
    if let Some(amount) = input.amount {
        if amount <= 0 {
            return Err(ProofError::InvalidAmount);
        }
    }
    if input.screenshot_path.trim().is_empty() {
        return Err(ProofError::MissingScreenshot);
    }
    let checksum = normalize_checksum(&input.checksum).ok_or(ProofError::InvalidChecksum)?;

    let user = db
        .get_user(input.user_id)?
        .ok_or(ProofError::UnknownUser(input.user_id))?;

    // The dedup check and the insert are one critical section; otherwise
    // two copies of the same screenshot could both pass the lookup.
    let _guard = db.write_guard();

    if db.get_proof_id_by_checksum(&checksum)?.is_some() {
        return Err(ProofError::DuplicateChecksum(checksum));
    }

    let proof = PaymentProof {
        id: Uuid::new_v4(),
        user_id: user.id,
        amount_input: input.amount,
        transfer_at: input.transfer_at,
        bank_name: input.bank_name,
        account_last4: input.account_last4,
        screenshot_path: input.screenshot_path,
        checksum,
        status: ProofStatus::Pending,
        reviewed_by: None,
        reviewed_at: None,
        notes: None,
        created_at: Utc::now(),
    };
    db.insert_proof(&proof)?;

    notify::notify_admins(
        db,
        NotificationKind::ProofSubmitted,
        "New payment proof",
        &format!("{} submitted a deposit proof", user.full_name),
    )?;

    tracing::info!(proof_id = %proof.id, user = %user.id, "payment proof submitted");
    Ok(proof)
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// Approves a PENDING proof and books its amount on the ledger.
///
/// `amount_override` fills in `amount_input` when the member left it
/// blank; it never overrides an amount already on the proof. The ledger
/// write is an upsert keyed by proof id, so a re-run cannot produce a
/// second entry.
pub fn approve_proof(
    db: &KasDb,
    proof_id: Uuid,
    reviewer_id: Uuid,
    amount_override: Option<i64>,
) -> Result<(PaymentProof, LedgerEntry), ProofError> {
    let reviewer = authorize_reviewer(db, reviewer_id)?;

    let _guard = db.write_guard();

    let mut proof = db.get_proof(proof_id)?.ok_or(ProofError::NotFound(proof_id))?;
    if proof.status != ProofStatus::Pending {
        return Err(ProofError::NotPending(proof.status));
    }

    let amount = match (proof.amount_input, amount_override) {
        (Some(a), _) => a,
        (None, Some(a)) if a > 0 => {
            proof.amount_input = Some(a);
            a
        }
        _ => return Err(ProofError::AmountMissing),
    };
    if amount <= 0 {
        return Err(ProofError::AmountMissing);
    }

    proof.status = ProofStatus::Approved;
    proof.reviewed_by = Some(reviewer.id);
    proof.reviewed_at = Some(Utc::now());
    db.put_proof(&proof)?;

    let entry = LedgerEntry::new(EntryKind::Credit, EntrySource::Proof, amount)
        .with_user(proof.user_id)
        .with_proof(proof.id)
        .with_note("cash deposit approved");
    let entry = db.upsert_proof_entry(entry)?;

    notify::notify_user(
        db,
        proof.user_id,
        NotificationKind::ProofApproved,
        "Deposit approved",
        &format!("Your deposit of {amount} was verified and credited"),
    )?;

    tracing::info!(
        proof_id = %proof.id,
        reviewer = %reviewer.id,
        amount,
        "payment proof approved"
    );
    Ok((proof, entry))
}

/// Rejects a proof, recording the reviewer and an optional reason.
///
/// Allowed from PENDING or — as the undo path — APPROVED, in which case
/// the proof's booked ledger entry is removed. REJECTED is terminal.
pub fn reject_proof(
    db: &KasDb,
    proof_id: Uuid,
    reviewer_id: Uuid,
    notes: Option<String>,
) -> Result<PaymentProof, ProofError> {
    let reviewer = authorize_reviewer(db, reviewer_id)?;

    let _guard = db.write_guard();

    let mut proof = db.get_proof(proof_id)?.ok_or(ProofError::NotFound(proof_id))?;
    if proof.status == ProofStatus::Rejected {
        return Err(ProofError::AlreadyRejected);
    }

    proof.status = ProofStatus::Rejected;
    proof.reviewed_by = Some(reviewer.id);
    proof.reviewed_at = Some(Utc::now());
    proof.notes = notes.filter(|n| !n.trim().is_empty());
    db.put_proof(&proof)?;

    let removed = db.delete_entry_for_proof(proof_id)?;

    notify::notify_user(
        db,
        proof.user_id,
        NotificationKind::ProofRejected,
        "Deposit rejected",
        proof
            .notes
            .as_deref()
            .unwrap_or("Your deposit proof was rejected"),
    )?;

    tracing::info!(
        proof_id = %proof.id,
        reviewer = %reviewer.id,
        entry_removed = removed,
        "payment proof rejected"
    );
    Ok(proof)
}

/// The review queue: PENDING proofs oldest first, joined with member
/// names.
pub fn list_pending(db: &KasDb, reviewer_id: Uuid) -> Result<Vec<PendingProof>, ProofError> {
    authorize_reviewer(db, reviewer_id)?;

    let proofs = db.list_proofs_by_status(ProofStatus::Pending)?;
    let mut queue = Vec::with_capacity(proofs.len());
    for proof in proofs {
        let member_name = db
            .get_user(proof.user_id)?
            .map(|u| u.full_name)
            .unwrap_or_else(|| "(unknown member)".to_string());
        queue.push(PendingProof { proof, member_name });
    }
    Ok(queue)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::summary::balance;
    use crate::member::{Role, User};
    use crate::proof::types::sha256_hex;

    fn test_db() -> (KasDb, User, User) {
        let db = KasDb::open_temporary().unwrap();
        let member = User::new("Budi", Role::Member);
        let treasurer = User::new("Sari", Role::Treasurer);
        db.put_user(&member).unwrap();
        db.put_user(&treasurer).unwrap();
        (db, member, treasurer)
    }

    fn new_proof(member: &User, amount: Option<i64>, evidence: &[u8]) -> NewProof {
        NewProof {
            user_id: member.id,
            amount,
            transfer_at: None,
            bank_name: Some("BCA".into()),
            account_last4: Some("1234".into()),
            screenshot_path: format!("{}/bukti.jpg", member.id),
            checksum: sha256_hex(evidence),
        }
    }

    #[test]
    fn submit_stores_pending_proof_and_notifies_admins() {
        let (db, member, _) = test_db();
        let proof = submit_proof(&db, new_proof(&member, Some(25_000), b"img-1")).unwrap();

        assert_eq!(proof.status, ProofStatus::Pending);
        assert_eq!(db.get_proof(proof.id).unwrap().unwrap().amount_input, Some(25_000));

        let feed = notify::list(&db, notify::NotificationScope::Admin).unwrap();
        assert_eq!(feed.items[0].kind, NotificationKind::ProofSubmitted);
    }

    #[test]
    fn submit_validates_amount_checksum_and_screenshot() {
        let (db, member, _) = test_db();

        assert!(matches!(
            submit_proof(&db, new_proof(&member, Some(0), b"a")),
            Err(ProofError::InvalidAmount)
        ));

        let mut bad = new_proof(&member, Some(100), b"b");
        bad.checksum = "nothex".into();
        assert!(matches!(
            submit_proof(&db, bad),
            Err(ProofError::InvalidChecksum)
        ));

        let mut bad = new_proof(&member, Some(100), b"c");
        bad.screenshot_path = "  ".into();
        assert!(matches!(
            submit_proof(&db, bad),
            Err(ProofError::MissingScreenshot)
        ));

        assert_eq!(db.proof_count(), 0);
    }

    #[test]
    fn duplicate_checksum_is_refused_with_specific_error() {
        let (db, member, _) = test_db();
        submit_proof(&db, new_proof(&member, Some(100), b"same-bytes")).unwrap();

        let err = submit_proof(&db, new_proof(&member, Some(100), b"same-bytes")).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, ProofError::DuplicateChecksum(_)));
        assert!(message.contains("duplicate proof"));
        assert!(message.contains(&sha256_hex(b"same-bytes")));
    }

    #[test]
    fn checksum_of_rejected_proof_still_blocks_resubmission() {
        let (db, member, treasurer) = test_db();
        let proof = submit_proof(&db, new_proof(&member, Some(100), b"evidence")).unwrap();
        reject_proof(&db, proof.id, treasurer.id, Some("blurry".into())).unwrap();

        assert!(matches!(
            submit_proof(&db, new_proof(&member, Some(100), b"evidence")),
            Err(ProofError::DuplicateChecksum(_))
        ));
    }

    #[test]
    fn approve_books_exactly_one_credit() {
        let (db, member, treasurer) = test_db();
        let proof = submit_proof(&db, new_proof(&member, Some(50_000), b"x")).unwrap();

        let (approved, entry) = approve_proof(&db, proof.id, treasurer.id, None).unwrap();
        assert_eq!(approved.status, ProofStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(treasurer.id));
        assert!(approved.reviewed_at.is_some());
        assert_eq!(entry.kind, EntryKind::Credit);
        assert_eq!(entry.source, EntrySource::Proof);
        assert_eq!(entry.amount, 50_000);
        assert_eq!(entry.proof_id, Some(proof.id));
        assert_eq!(db.entry_count(), 1);
        assert_eq!(balance(&db).unwrap(), 50_000);
    }

    #[test]
    fn second_approval_is_refused_and_books_nothing() {
        let (db, member, treasurer) = test_db();
        let proof = submit_proof(&db, new_proof(&member, Some(10_000), b"y")).unwrap();
        approve_proof(&db, proof.id, treasurer.id, None).unwrap();

        let err = approve_proof(&db, proof.id, treasurer.id, None).unwrap_err();
        assert!(matches!(err, ProofError::NotPending(ProofStatus::Approved)));
        assert_eq!(db.entry_count(), 1);
        assert_eq!(balance(&db).unwrap(), 10_000);
    }

    #[test]
    fn concurrent_approvals_book_exactly_one_entry() {
        use std::sync::Arc;
        use std::thread;

        let (db, member, treasurer) = test_db();
        let proof = submit_proof(&db, new_proof(&member, Some(7_000), b"race")).unwrap();

        let db = Arc::new(db);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = Arc::clone(&db);
                let proof_id = proof.id;
                let reviewer = treasurer.id;
                thread::spawn(move || approve_proof(&db, proof_id, reviewer, None).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().expect("approval thread panicked"))
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(db.entry_count(), 1);
        assert_eq!(balance(&db).unwrap(), 7_000);
    }

    #[test]
    fn approve_uses_override_only_when_amount_is_blank() {
        let (db, member, treasurer) = test_db();

        // Blank amount, no override: refused.
        let blank = submit_proof(&db, new_proof(&member, None, b"p1")).unwrap();
        assert!(matches!(
            approve_proof(&db, blank.id, treasurer.id, None),
            Err(ProofError::AmountMissing)
        ));

        // Blank amount, override supplied: booked and persisted.
        let (approved, entry) = approve_proof(&db, blank.id, treasurer.id, Some(33_000)).unwrap();
        assert_eq!(approved.amount_input, Some(33_000));
        assert_eq!(entry.amount, 33_000);

        // Filled amount: the override is ignored.
        let filled = submit_proof(&db, new_proof(&member, Some(20_000), b"p2")).unwrap();
        let (_, entry) = approve_proof(&db, filled.id, treasurer.id, Some(99_999)).unwrap();
        assert_eq!(entry.amount, 20_000);
    }

    #[test]
    fn approve_requires_reviewer_role() {
        let (db, member, _) = test_db();
        let proof = submit_proof(&db, new_proof(&member, Some(100), b"z")).unwrap();

        assert!(matches!(
            approve_proof(&db, proof.id, member.id, None),
            Err(ProofError::Review(ReviewError::Forbidden(Role::Member)))
        ));
        assert!(matches!(
            approve_proof(&db, proof.id, Uuid::new_v4(), None),
            Err(ProofError::Review(ReviewError::UnknownReviewer(_)))
        ));
    }

    #[test]
    fn reject_pending_records_reason_and_notifies() {
        let (db, member, treasurer) = test_db();
        let proof = submit_proof(&db, new_proof(&member, Some(100), b"r1")).unwrap();

        let rejected =
            reject_proof(&db, proof.id, treasurer.id, Some("wrong account".into())).unwrap();
        assert_eq!(rejected.status, ProofStatus::Rejected);
        assert_eq!(rejected.notes.as_deref(), Some("wrong account"));
        assert_eq!(db.entry_count(), 0);

        let feed = notify::list(&db, notify::NotificationScope::User(member.id)).unwrap();
        assert_eq!(feed.items[0].kind, NotificationKind::ProofRejected);
        assert_eq!(feed.items[0].body, "wrong account");
    }

    #[test]
    fn reject_after_approve_removes_the_booked_entry() {
        let (db, member, treasurer) = test_db();
        let proof = submit_proof(&db, new_proof(&member, Some(40_000), b"undo")).unwrap();
        approve_proof(&db, proof.id, treasurer.id, None).unwrap();
        assert_eq!(balance(&db).unwrap(), 40_000);

        reject_proof(&db, proof.id, treasurer.id, Some("duplicate transfer".into())).unwrap();
        assert_eq!(db.entry_count(), 0);
        assert_eq!(balance(&db).unwrap(), 0);
        assert!(db.get_entry_for_proof(proof.id).unwrap().is_none());
    }

    #[test]
    fn reject_is_terminal() {
        let (db, member, treasurer) = test_db();
        let proof = submit_proof(&db, new_proof(&member, Some(100), b"t")).unwrap();
        reject_proof(&db, proof.id, treasurer.id, None).unwrap();

        assert!(matches!(
            reject_proof(&db, proof.id, treasurer.id, None),
            Err(ProofError::AlreadyRejected)
        ));
        assert!(matches!(
            approve_proof(&db, proof.id, treasurer.id, None),
            Err(ProofError::NotPending(ProofStatus::Rejected))
        ));
    }

    #[test]
    fn pending_queue_is_oldest_first_with_member_names() {
        let (db, member, treasurer) = test_db();
        let first = submit_proof(&db, new_proof(&member, Some(100), b"q1")).unwrap();
        let second = submit_proof(&db, new_proof(&member, Some(200), b"q2")).unwrap();

        // Settled proofs leave the queue.
        approve_proof(&db, first.id, treasurer.id, None).unwrap();

        let queue = list_pending(&db, treasurer.id).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].proof.id, second.id);
        assert_eq!(queue[0].member_name, "Budi");
    }
}
