//! Account-request queue.
//!
//! Prospective members submit a request with their contact details. An
//! administrator reviews it: approval creates a [`User`] with an assigned
//! role and removes the request, rejection just removes it. Requests are
//! transient — the table is empty whenever the queue is clear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::{authorize_reviewer, ReviewError, Role, User};
use crate::notify::{self, NotificationKind};
use crate::storage::db::{DbError, KasDb};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A pending membership request awaiting administrator review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRequest {
    /// Request identifier.
    pub id: Uuid,
    /// Applicant's display name.
    pub full_name: String,
    /// Contact email. Unique among pending requests.
    pub email: String,
    /// Requested credential, carried verbatim until review.
    ///
    /// There is no auth provider behind this service; the field exists so
    /// an operator handing out accounts elsewhere can read it once, and it
    /// is discarded on approval.
    pub password: String,
    /// Optional WhatsApp contact number.
    pub whatsapp: Option<String>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// Input for a new account request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub whatsapp: Option<String>,
}

/// Errors that can occur in the account-request workflow.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// A required field was empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A pending request already uses this email.
    #[error("a pending request for {0} already exists")]
    DuplicateEmail(String),

    /// No request with the given id exists.
    #[error("request not found: {0}")]
    NotFound(Uuid),

    /// The acting user may not review requests.
    #[error(transparent)]
    Review(#[from] ReviewError),

    /// Storage failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Submits a new account request.
///
/// Refuses empty names/emails/passwords and duplicate pending emails, then
/// queues the request and notifies administrators.
pub fn submit_request(db: &KasDb, input: NewRequest) -> Result<AccountRequest, RequestError> {
    let full_name = input.full_name.trim();
    let email = input.email.trim();
    if full_name.is_empty() {
        return Err(RequestError::MissingField("full_name"));
    }
    if email.is_empty() {
        return Err(RequestError::MissingField("email"));
    }
    if input.password.is_empty() {
        return Err(RequestError::MissingField("password"));
    }

    let _guard = db.write_guard();

    let duplicate = db
        .list_requests()?
        .iter()
        .any(|r| r.email.eq_ignore_ascii_case(email));
    if duplicate {
        return Err(RequestError::DuplicateEmail(email.to_string()));
    }

    let request = AccountRequest {
        id: Uuid::new_v4(),
        full_name: full_name.to_string(),
        email: email.to_string(),
        password: input.password,
        whatsapp: input.whatsapp.filter(|w| !w.trim().is_empty()),
        created_at: Utc::now(),
    };
    db.put_request(&request)?;

    notify::notify_admins(
        db,
        NotificationKind::RequestSubmitted,
        "New account request",
        &format!("{} asked to join the fund", request.full_name),
    )?;

    tracing::info!(request_id = %request.id, "account request submitted");
    Ok(request)
}

/// Lists pending requests, oldest first.
pub fn list_requests(db: &KasDb, reviewer_id: Uuid) -> Result<Vec<AccountRequest>, RequestError> {
    authorize_reviewer(db, reviewer_id)?;
    Ok(db.list_requests()?)
}

/// Approves a request: creates a user with the chosen role (MEMBER when
/// unspecified) and deletes the request row.
pub fn approve_request(
    db: &KasDb,
    request_id: Uuid,
    reviewer_id: Uuid,
    role: Option<Role>,
) -> Result<User, RequestError> {
    authorize_reviewer(db, reviewer_id)?;

    let _guard = db.write_guard();

    let request = db
        .get_request(request_id)?
        .ok_or(RequestError::NotFound(request_id))?;

    let user = User::new(request.full_name.clone(), role.unwrap_or(Role::Member));
    db.put_user(&user)?;
    db.delete_request(request_id)?;

    tracing::info!(
        request_id = %request_id,
        user_id = %user.id,
        role = %user.role,
        "account request approved"
    );
    Ok(user)
}

/// Rejects a request by deleting it. No user is created.
pub fn reject_request(db: &KasDb, request_id: Uuid, reviewer_id: Uuid) -> Result<(), RequestError> {
    authorize_reviewer(db, reviewer_id)?;

    let _guard = db.write_guard();

    if db.get_request(request_id)?.is_none() {
        return Err(RequestError::NotFound(request_id));
    }
    db.delete_request(request_id)?;

    tracing::info!(request_id = %request_id, "account request rejected");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
