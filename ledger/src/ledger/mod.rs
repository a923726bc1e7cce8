//! # Ledger Module
//!
//! The money trail. Every credit and debit the fund ever records is a
//! [`LedgerEntry`]; the balance and all summaries are folds over those
//! rows, computed on demand rather than cached. Reconciliation and manual
//! adjustments live in [`reconcile`], aggregation in [`summary`].

pub mod entry;
pub mod month;
pub mod reconcile;
pub mod summary;

pub use entry::{EntryKind, EntrySource, LedgerEntry};
pub use month::{Month, MonthError};
pub use reconcile::LedgerError;
pub use summary::{MonthlyTotals, Summary};
