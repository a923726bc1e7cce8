//! # Payment Proof Module
//!
//! Members transfer their dues to the fund's bank account and submit a
//! screenshot as evidence. A proof sits PENDING until a treasurer reviews
//! it: approval books the amount as a CREDIT ledger entry (exactly one per
//! proof), rejection records the reason and removes any booked entry.

pub mod types;
pub mod workflow;

pub use types::{PaymentProof, ProofStatus};
pub use workflow::{NewProof, PendingProof, ProofError};
