//! Ledger aggregation: balances, monthly totals, and recent entries.
//!
//! Nothing here writes. Every figure is a fold over stored rows, so the
//! numbers cannot drift from the ledger the way a cached balance column
//! would.

use serde::{Deserialize, Serialize};

use super::entry::{EntryKind, LedgerEntry};
use super::month::Month;
use crate::config::RECENT_ENTRIES_LIMIT;
use crate::storage::db::{DbError, KasDb};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Per-month credit/debit totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    /// Sum of CREDIT amounts in the month.
    pub credit: i64,
    /// Sum of DEBIT amounts in the month.
    pub debit: i64,
    /// `credit - debit`.
    pub net: i64,
}

/// The public fund summary: all-time balance, one month's totals, and the
/// most recent entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// The month the `monthly` block covers.
    pub month: Month,
    /// All-time signed balance, independent of the month filter.
    pub total_all_time: i64,
    /// Credit/debit/net for `month`.
    pub monthly: MonthlyTotals,
    /// Most recent entries, newest first. Month-filtered when a month was
    /// requested explicitly.
    pub recent: Vec<LedgerEntry>,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// All-time signed balance: Σ credit − Σ debit over every ledger row.
pub fn balance(db: &KasDb) -> Result<i64, DbError> {
    Ok(db
        .all_entries()?
        .iter()
        .map(LedgerEntry::signed_amount)
        .sum())
}

/// Credit/debit/net totals for one month.
pub fn monthly_totals(db: &KasDb, month: Month) -> Result<MonthlyTotals, DbError> {
    let (start, end) = month.range();
    let mut credit = 0i64;
    let mut debit = 0i64;
    for entry in db.entries_in_range(start, end)? {
        match entry.kind {
            EntryKind::Credit => credit += entry.amount,
            EntryKind::Debit => debit += entry.amount,
        }
    }
    Ok(MonthlyTotals {
        credit,
        debit,
        net: credit - debit,
    })
}

/// The most recent entries, newest first, capped at
/// [`RECENT_ENTRIES_LIMIT`]. With a month filter, only that month's
/// entries are considered.
pub fn recent_entries(db: &KasDb, month: Option<Month>) -> Result<Vec<LedgerEntry>, DbError> {
    let mut entries = match month {
        Some(m) => {
            let (start, end) = m.range();
            db.entries_in_range(start, end)?
        }
        None => db.all_entries()?,
    };
    // Storage scans ascending; the feed wants newest first.
    entries.reverse();
    entries.truncate(RECENT_ENTRIES_LIMIT);
    Ok(entries)
}

/// Builds the full public summary. When no month is given, the current UTC
/// month is reported and the recent feed is unfiltered.
pub fn summary(db: &KasDb, month: Option<Month>) -> Result<Summary, DbError> {
    let report_month = month.unwrap_or_else(Month::current);
    Ok(Summary {
        month: report_month,
        total_all_time: balance(db)?,
        monthly: monthly_totals(db, report_month)?,
        recent: recent_entries(db, month)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
