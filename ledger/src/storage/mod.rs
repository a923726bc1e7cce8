//! # Storage Module
//!
//! Persistence for the fund, built on sled's embedded key-value store.
//! [`db::KasDb`] is the only type that touches disk; everything above it
//! works with typed rows.

pub mod db;

pub use db::{DbError, DbResult, KasDb};
