//! Core ledger entry types.
//!
//! Amounts are integers in the smallest currency unit. Every stored amount
//! is positive; direction comes from [`EntryKind`], and only the derived
//! balance may go negative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// EntryKind
// ---------------------------------------------------------------------------

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Money into the fund.
    Credit,
    /// Money out of the fund.
    Debit,
}

impl EntryKind {
    /// The kind that cancels this one out.
    pub fn opposite(self) -> Self {
        match self {
            Self::Credit => Self::Debit,
            Self::Debit => Self::Credit,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credit => write!(f, "CREDIT"),
            Self::Debit => write!(f, "DEBIT"),
        }
    }
}

// ---------------------------------------------------------------------------
// EntrySource
// ---------------------------------------------------------------------------

/// What produced a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntrySource {
    /// Booked by approving a payment proof.
    Proof,
    /// Manual treasurer action: income, expense, or a balance reset.
    Adjustment,
}

impl fmt::Display for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proof => write!(f, "PROOF"),
            Self::Adjustment => write!(f, "ADJUSTMENT"),
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerEntry
// ---------------------------------------------------------------------------

/// One credit or debit on the fund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry identifier.
    pub id: Uuid,
    /// When the entry was booked. Also part of the storage key, so entries
    /// scan in time order.
    pub created_at: DateTime<Utc>,
    /// Credit or debit.
    pub kind: EntryKind,
    /// Positive amount in the smallest currency unit.
    pub amount: i64,
    /// Free-form annotation shown in summaries.
    pub note: Option<String>,
    /// What produced the entry.
    pub source: EntrySource,
    /// The member this entry concerns, when there is one.
    pub user_id: Option<Uuid>,
    /// The payment proof backing this entry. At most one entry per proof.
    pub proof_id: Option<Uuid>,
}

impl LedgerEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(kind: EntryKind, source: EntrySource, amount: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            kind,
            amount,
            note: None,
            source,
            user_id: None,
            proof_id: None,
        }
    }

    /// Attaches an annotation.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Attaches the member concerned.
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Attaches the backing payment proof.
    pub fn with_proof(mut self, proof_id: Uuid) -> Self {
        self.proof_id = Some(proof_id);
        self
    }

    /// The entry's contribution to the fund balance: `+amount` for credits,
    /// `-amount` for debits.
    pub fn signed_amount(&self) -> i64 {
        match self.kind {
            EntryKind::Credit => self.amount,
            EntryKind::Debit => -self.amount,
        }
    }
}
