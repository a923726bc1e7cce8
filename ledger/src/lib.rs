// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # kas — Community Cash Fund Core
//!
//! Domain library for the kas service: a small treasury for a neighborhood
//! community. Members hand over deposits and submit proof of transfer,
//! treasurers verify them, and every rupiah that moves lands in an
//! append-style ledger that the whole community can audit.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of a
//! community treasury:
//!
//! - **member** — users, roles, and the account-request queue.
//! - **proof** — payment proofs and their PENDING → APPROVED/REJECTED flow.
//! - **ledger** — credit/debit entries, balances, monthly summaries, and
//!   reconciliation.
//! - **notify** — read/unread notices for members and administrators.
//! - **storage** — the embedded sled database everything persists into.
//! - **config** — service constants and limits.
//!
//! ## Design Philosophy
//!
//! 1. Every balance is derived, never stored — fold the ledger, trust math.
//! 2. If it touches money, it has tests. Plural.
//! 3. Check-then-act sequences hold the write guard. No phantom approvals.

pub mod config;
pub mod ledger;
pub mod member;
pub mod notify;
pub mod proof;
pub mod storage;
