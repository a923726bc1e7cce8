//! # KasDb — Persistent Storage Engine
//!
//! The persistence layer for the fund, built on sled's embedded key-value
//! store. All on-disk data flows through this module.
//!
//! ## Tree Layout
//!
//! sled organizes data into named "trees" (analogous to tables in SQL).
//! Each tree is an independent B+ tree with its own keyspace:
//!
//! | Tree            | Key                          | Value                     |
//! |-----------------|------------------------------|---------------------------|
//! | `users`         | user id (16B)                | `bincode(User)`           |
//! | `requests`      | request id (16B)             | `bincode(AccountRequest)` |
//! | `proofs`        | proof id (16B)               | `bincode(PaymentProof)`   |
//! | `checksums`     | checksum hex (UTF-8)         | proof id (16B)            |
//! | `ledger`        | millis (8B BE) ++ id (16B)   | `bincode(LedgerEntry)`    |
//! | `proof_entries` | proof id (16B)               | ledger key (24B)          |
//! | `notifications` | millis (8B BE) ++ id (16B)   | `bincode(Notification)`   |
//!
//! Ledger and notification keys lead with the creation time as big-endian
//! millis so sled's lexicographic order is time order — month queries and
//! "newest first" feeds are plain range scans.
//!
//! ## Write Serialization
//!
//! sled handles concurrent access to individual trees, but the workflows
//! above this module run check-then-act sequences spanning several trees
//! (status check, then ledger write; checksum lookup, then insert). Those
//! sequences take [`KasDb::write_guard`] so only one runs at a time.

use parking_lot::{Mutex, MutexGuard};
use sled::{Db, Tree};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::ledger::entry::LedgerEntry;
use crate::member::request::AccountRequest;
use crate::member::user::User;
use crate::notify::Notification;
use crate::proof::types::{PaymentProof, ProofStatus};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type DbResult<T> = Result<T, DbError>;

fn encode<T: serde::Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Key Construction
// ---------------------------------------------------------------------------

/// Builds a time-ordered key: creation millis (8B BE) followed by the row
/// id, which keeps simultaneous rows distinct.
fn timed_key(created_at: chrono::DateTime<chrono::Utc>, id: Uuid) -> [u8; 24] {
    let millis = u64::try_from(created_at.timestamp_millis()).unwrap_or(0);
    let mut key = [0u8; 24];
    key[..8].copy_from_slice(&millis.to_be_bytes());
    key[8..].copy_from_slice(id.as_bytes());
    key
}

/// The storage key of a ledger entry.
fn ledger_key(entry: &LedgerEntry) -> [u8; 24] {
    timed_key(entry.created_at, entry.id)
}

// ---------------------------------------------------------------------------
// KasDb
// ---------------------------------------------------------------------------

/// Persistent storage engine for the community fund.
///
/// Wraps a sled `Db` and exposes typed accessors for users, account
/// requests, payment proofs, ledger entries, and notifications. All
/// serialization uses bincode.
///
/// # Thread Safety
///
/// sled trees support lock-free concurrent reads and serialized writes, so
/// `KasDb` can be shared via `Arc<KasDb>` (or cloned — clones share the
/// same underlying database and write guard).
#[derive(Debug, Clone)]
pub struct KasDb {
    /// The underlying sled database handle.
    db: Db,
    /// Users indexed by id.
    users: Tree,
    /// Pending account requests indexed by id.
    requests: Tree,
    /// Payment proofs indexed by id.
    proofs: Tree,
    /// Dedup index: evidence checksum -> proof id.
    checksums: Tree,
    /// Ledger entries in time order.
    ledger: Tree,
    /// Index: proof id -> ledger key, enforcing one entry per proof.
    proof_entries: Tree,
    /// Notifications in time order.
    notifications: Tree,
    /// Serializes multi-tree check-then-act sequences (see module docs).
    write_lock: Arc<Mutex<()>>,
}

impl KasDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that lives in memory and is cleaned up
    /// when dropped. Ideal for tests — no filesystem side effects.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let users = db.open_tree("users")?;
        let requests = db.open_tree("requests")?;
        let proofs = db.open_tree("proofs")?;
        let checksums = db.open_tree("checksums")?;
        let ledger = db.open_tree("ledger")?;
        let proof_entries = db.open_tree("proof_entries")?;
        let notifications = db.open_tree("notifications")?;

        Ok(Self {
            db,
            users,
            requests,
            proofs,
            checksums,
            ledger,
            proof_entries,
            notifications,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Takes the write guard serializing check-then-act sequences.
    ///
    /// Held for the duration of any workflow that reads state and then
    /// writes based on it (proof approval, balance reset, dedup insert).
    /// Not reentrant — functions holding the guard must not call other
    /// guard-taking functions.
    pub fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock()
    }

    // -- User operations ----------------------------------------------------

    /// Insert or overwrite a user row.
    pub fn put_user(&self, user: &User) -> DbResult<()> {
        self.users.insert(user.id.as_bytes(), encode(user)?)?;
        Ok(())
    }

    /// Retrieve a user by id. Returns `None` for unknown ids.
    pub fn get_user(&self, id: Uuid) -> DbResult<Option<User>> {
        match self.users.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Number of registered users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    // -- Account request operations ------------------------------------------

    /// Insert or overwrite an account request.
    pub fn put_request(&self, request: &AccountRequest) -> DbResult<()> {
        self.requests
            .insert(request.id.as_bytes(), encode(request)?)?;
        Ok(())
    }

    /// Retrieve a request by id.
    pub fn get_request(&self, id: Uuid) -> DbResult<Option<AccountRequest>> {
        match self.requests.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete a request row. Deleting a missing row is a no-op.
    pub fn delete_request(&self, id: Uuid) -> DbResult<()> {
        self.requests.remove(id.as_bytes())?;
        Ok(())
    }

    /// All pending requests, oldest first.
    pub fn list_requests(&self) -> DbResult<Vec<AccountRequest>> {
        let mut requests = Vec::new();
        for item in self.requests.iter() {
            let (_, value) = item?;
            requests.push(decode::<AccountRequest>(&value)?);
        }
        requests.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(requests)
    }

    /// Number of queued requests.
    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    // -- Proof operations ----------------------------------------------------

    /// Persist a brand-new proof and register its checksum in the dedup
    /// index. Callers check the index first (under the write guard).
    pub fn insert_proof(&self, proof: &PaymentProof) -> DbResult<()> {
        self.proofs.insert(proof.id.as_bytes(), encode(proof)?)?;
        self.checksums
            .insert(proof.checksum.as_bytes(), proof.id.as_bytes())?;
        Ok(())
    }

    /// Overwrite an existing proof row (status transitions, amount fill).
    /// The checksum index is untouched — checksums never change.
    pub fn put_proof(&self, proof: &PaymentProof) -> DbResult<()> {
        self.proofs.insert(proof.id.as_bytes(), encode(proof)?)?;
        Ok(())
    }

    /// Retrieve a proof by id.
    pub fn get_proof(&self, id: Uuid) -> DbResult<Option<PaymentProof>> {
        match self.proofs.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Look up which proof (if any) already carries a checksum.
    pub fn get_proof_id_by_checksum(&self, checksum: &str) -> DbResult<Option<Uuid>> {
        match self.checksums.get(checksum.as_bytes())? {
            Some(bytes) => {
                let id = Uuid::from_slice(bytes.as_ref())
                    .map_err(|e| DbError::Serialization(e.to_string()))?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// All proofs in the given status, oldest first.
    pub fn list_proofs_by_status(&self, status: ProofStatus) -> DbResult<Vec<PaymentProof>> {
        let mut proofs = Vec::new();
        for item in self.proofs.iter() {
            let (_, value) = item?;
            let proof: PaymentProof = decode(&value)?;
            if proof.status == status {
                proofs.push(proof);
            }
        }
        proofs.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(proofs)
    }

    /// Number of stored proofs, any status.
    pub fn proof_count(&self) -> usize {
        self.proofs.len()
    }

    // -- Ledger operations ---------------------------------------------------

    /// Append a ledger entry. When the entry is proof-backed, the
    /// proof-to-entry index is updated alongside.
    pub fn append_entry(&self, entry: &LedgerEntry) -> DbResult<()> {
        let key = ledger_key(entry);
        self.ledger.insert(key, encode(entry)?)?;
        if let Some(proof_id) = entry.proof_id {
            self.proof_entries.insert(proof_id.as_bytes(), &key)?;
        }
        Ok(())
    }

    /// The ledger entry booked for a proof, if one exists.
    pub fn get_entry_for_proof(&self, proof_id: Uuid) -> DbResult<Option<LedgerEntry>> {
        let Some(key) = self.proof_entries.get(proof_id.as_bytes())? else {
            return Ok(None);
        };
        match self.ledger.get(&key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Insert-or-update the single ledger entry for a proof.
    ///
    /// When the proof already has an entry, its id, creation time, and
    /// storage key are preserved and the remaining fields are replaced
    /// from `entry`; otherwise `entry` is appended as-is. Returns the row
    /// that ended up stored. Callers hold the write guard.
    pub fn upsert_proof_entry(&self, entry: LedgerEntry) -> DbResult<LedgerEntry> {
        let Some(proof_id) = entry.proof_id else {
            self.append_entry(&entry)?;
            return Ok(entry);
        };

        match self.get_entry_for_proof(proof_id)? {
            Some(existing) => {
                let updated = LedgerEntry {
                    id: existing.id,
                    created_at: existing.created_at,
                    ..entry
                };
                self.ledger.insert(ledger_key(&updated), encode(&updated)?)?;
                Ok(updated)
            }
            None => {
                self.append_entry(&entry)?;
                Ok(entry)
            }
        }
    }

    /// Remove the ledger entry booked for a proof, along with its index
    /// row. Returns whether an entry existed.
    pub fn delete_entry_for_proof(&self, proof_id: Uuid) -> DbResult<bool> {
        let Some(key) = self.proof_entries.remove(proof_id.as_bytes())? else {
            return Ok(false);
        };
        Ok(self.ledger.remove(&key)?.is_some())
    }

    /// Ledger entries in the half-open time range `[start, end)`,
    /// ascending.
    pub fn entries_in_range(
        &self,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    ) -> DbResult<Vec<LedgerEntry>> {
        let start_key = timed_key(start, Uuid::nil());
        let end_key = timed_key(end, Uuid::nil());

        let mut entries = Vec::new();
        for item in self.ledger.range(start_key..end_key) {
            let (_, value) = item?;
            entries.push(decode::<LedgerEntry>(&value)?);
        }
        Ok(entries)
    }

    /// Every ledger entry, ascending by time.
    pub fn all_entries(&self) -> DbResult<Vec<LedgerEntry>> {
        let mut entries = Vec::new();
        for item in self.ledger.iter() {
            let (_, value) = item?;
            entries.push(decode::<LedgerEntry>(&value)?);
        }
        Ok(entries)
    }

    /// Number of ledger entries.
    pub fn entry_count(&self) -> usize {
        self.ledger.len()
    }

    /// Delete every ledger entry and the proof index. Returns how many
    /// entries were removed.
    pub fn clear_ledger(&self) -> DbResult<u64> {
        let removed = self.ledger.len() as u64;
        self.ledger.clear()?;
        self.proof_entries.clear()?;
        Ok(removed)
    }

    // -- Notification operations ---------------------------------------------

    /// Insert or overwrite a notification. The key derives from the row's
    /// creation time and id, so re-putting an updated row (read flag)
    /// lands on the same key.
    pub fn put_notification(&self, notification: &Notification) -> DbResult<()> {
        let key = timed_key(notification.created_at, notification.id);
        self.notifications.insert(key, encode(notification)?)?;
        Ok(())
    }

    /// Every notification, newest first. Feeds filter and cap on top.
    pub fn list_notifications_desc(&self) -> DbResult<Vec<Notification>> {
        let mut notifications = Vec::new();
        for item in self.notifications.iter().rev() {
            let (_, value) = item?;
            notifications.push(decode::<Notification>(&value)?);
        }
        Ok(notifications)
    }

    /// Number of stored notifications.
    pub fn notification_count(&self) -> usize {
        self.notifications.len()
    }

    // -- Utility operations --------------------------------------------------

    /// Force a flush of all pending writes to disk.
    ///
    /// sled buffers writes in memory for performance. This call blocks
    /// until all data is durable on the underlying storage device.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
