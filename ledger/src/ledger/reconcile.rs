//! Treasurer actions that write to the ledger directly: manual income and
//! expense adjustments, the reset-to-zero counter-entry, and the full wipe.
//!
//! Reset works off the live balance, so the read-compute-insert sequence
//! holds the database write guard; two concurrent resets must not both
//! observe the same nonzero balance and double-correct it.

use uuid::Uuid;

use super::entry::{EntryKind, EntrySource, LedgerEntry};
use super::summary::balance;
use crate::member::{authorize_reviewer, ReviewError};
use crate::storage::db::{DbError, KasDb};

/// Errors from ledger adjustment workflows.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The amount is zero or negative.
    #[error("invalid amount: must be a positive number")]
    InvalidAmount,

    /// The acting user may not adjust the ledger.
    #[error(transparent)]
    Review(#[from] ReviewError),

    /// Storage failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Default annotation for manual income entries.
const INCOME_NOTE: &str = "manual cash deposit";

/// Default annotation for manual expense entries.
const EXPENSE_NOTE: &str = "manual cash expense";

/// Annotation for reset counter-entries.
const RESET_NOTE: &str = "adjustment: reset balance to zero";

/// Records a manual CREDIT adjustment (cash handed to the treasurer).
pub fn record_income(
    db: &KasDb,
    reviewer_id: Uuid,
    amount: i64,
    note: Option<String>,
) -> Result<LedgerEntry, LedgerError> {
    record_adjustment(db, reviewer_id, EntryKind::Credit, amount, note, INCOME_NOTE)
}

/// Records a manual DEBIT adjustment (a fund expense).
pub fn record_expense(
    db: &KasDb,
    reviewer_id: Uuid,
    amount: i64,
    note: Option<String>,
) -> Result<LedgerEntry, LedgerError> {
    record_adjustment(db, reviewer_id, EntryKind::Debit, amount, note, EXPENSE_NOTE)
}

fn record_adjustment(
    db: &KasDb,
    reviewer_id: Uuid,
    kind: EntryKind,
    amount: i64,
    note: Option<String>,
    default_note: &str,
) -> Result<LedgerEntry, LedgerError> {
    let reviewer = authorize_reviewer(db, reviewer_id)?;
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount);
    }

    let _guard = db.write_guard();

    let entry = LedgerEntry::new(kind, EntrySource::Adjustment, amount)
        .with_user(reviewer.id)
        .with_note(note.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| default_note.to_string()));
    db.append_entry(&entry)?;

    tracing::info!(kind = %kind, amount, reviewer = %reviewer.id, "manual adjustment recorded");
    Ok(entry)
}

/// Resets the fund balance to zero.
///
/// Computes the current signed balance and inserts one ADJUSTMENT entry of
/// the opposite kind with `amount = |balance|`, so the post-insert balance
/// is exactly zero. Returns `None` without writing when the balance is
/// already zero.
pub fn reset_balance(db: &KasDb, reviewer_id: Uuid) -> Result<Option<LedgerEntry>, LedgerError> {
    authorize_reviewer(db, reviewer_id)?;

    let _guard = db.write_guard();

    let current = balance(db)?;
    if current == 0 {
        tracing::info!("reset requested but balance is already zero");
        return Ok(None);
    }

    let kind = if current > 0 {
        EntryKind::Debit
    } else {
        EntryKind::Credit
    };
    let entry = LedgerEntry::new(kind, EntrySource::Adjustment, current.abs())
        .with_note(RESET_NOTE);
    db.append_entry(&entry)?;

    tracing::info!(kind = %kind, amount = current.abs(), "balance reset to zero");
    Ok(Some(entry))
}

/// Deletes every ledger row. Returns how many were removed.
///
/// This is the administrative "start the book over" action; proofs,
/// members, and notifications are untouched.
pub fn wipe(db: &KasDb, reviewer_id: Uuid) -> Result<u64, LedgerError> {
    authorize_reviewer(db, reviewer_id)?;

    let _guard = db.write_guard();
    let removed = db.clear_ledger()?;
    tracing::warn!(removed, "ledger wiped");
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
