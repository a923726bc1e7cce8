//! Payment proof types and checksum helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use crate::config::CHECKSUM_HEX_LENGTH;

// ---------------------------------------------------------------------------
// ProofStatus
// ---------------------------------------------------------------------------

/// Review state of a payment proof.
///
/// PENDING → APPROVED or REJECTED; an APPROVED proof may still be walked
/// back to REJECTED (undo), REJECTED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProofStatus {
    /// Submitted, awaiting review.
    Pending,
    /// Verified by a reviewer; its amount is booked on the ledger.
    Approved,
    /// Refused by a reviewer. Any booked entry has been removed.
    Rejected,
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

// ---------------------------------------------------------------------------
// PaymentProof
// ---------------------------------------------------------------------------

/// A member's claim of a completed transfer, with evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    /// Proof identifier.
    pub id: Uuid,
    /// The submitting member.
    pub user_id: Uuid,
    /// Claimed amount. May be absent on submission and supplied by the
    /// reviewer at approval time.
    pub amount_input: Option<i64>,
    /// When the member says the transfer happened.
    pub transfer_at: Option<DateTime<Utc>>,
    /// Bank the transfer was sent from.
    pub bank_name: Option<String>,
    /// Last four digits of the sending account.
    pub account_last4: Option<String>,
    /// Storage path of the evidence screenshot. The object itself lives
    /// outside this service.
    pub screenshot_path: String,
    /// Lowercase SHA-256 hex of the evidence bytes. Unique across all
    /// proofs — the duplicate-submission tripwire.
    pub checksum: String,
    /// Review state.
    pub status: ProofStatus,
    /// Reviewer who settled the proof.
    pub reviewed_by: Option<Uuid>,
    /// When the proof was settled.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Reviewer's notes, typically a rejection reason.
    pub notes: Option<String>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Checksums
// ---------------------------------------------------------------------------

/// SHA-256 of the evidence bytes as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Validates and normalizes a caller-supplied checksum to lowercase hex.
///
/// Returns `None` unless the input is exactly 64 hex characters.
pub fn normalize_checksum(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.len() != CHECKSUM_HEX_LENGTH
        || !trimmed.chars().all(|c| c.is_ascii_hexdigit())
    {
        return None;
    }
    Some(trimmed.to_ascii_lowercase())
}
