//! # Service Configuration & Constants
//!
//! Every magic number in kas lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the treasurer coffee.

// ---------------------------------------------------------------------------
// Service Identity
// ---------------------------------------------------------------------------

/// Human-readable service name, used in logs and the version banner.
pub const SERVICE_NAME: &str = "kas";

/// Service version string, assembled at compile time.
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Proof Submission Limits
// ---------------------------------------------------------------------------

/// Maximum size of an uploaded proof screenshot, in bytes (5 MiB).
///
/// The upload itself happens outside this service; the limit is published
/// here so every front door enforces the same number.
pub const MAX_SCREENSHOT_BYTES: u64 = 5 * 1024 * 1024;

/// Length of a SHA-256 checksum in lowercase hex characters.
///
/// Proof submissions carry the checksum of the evidence image; anything
/// that isn't exactly this long is rejected before it touches storage.
pub const CHECKSUM_HEX_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Listing Limits
// ---------------------------------------------------------------------------

/// Number of ledger entries returned in the "recent" section of a summary.
pub const RECENT_ENTRIES_LIMIT: usize = 20;

/// Maximum notifications returned per feed query.
pub const NOTIFICATION_PAGE_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// Network Defaults
// ---------------------------------------------------------------------------

/// Default port for the HTTP JSON API.
pub const DEFAULT_API_PORT: u16 = 8321;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 8322;
