//! # REST API
//!
//! Builds the axum router that exposes the fund's HTTP interface. All
//! endpoints share application state through axum's `State` extractor and
//! answer JSON: `{ok: …}` on success, `{error: …}` with a matching HTTP
//! status on failure.
//!
//! ## Endpoints
//!
//! | Method | Path                              | Description                       |
//! |--------|-----------------------------------|-----------------------------------|
//! | GET    | `/health`                         | Liveness probe                    |
//! | GET    | `/api/public/summary`             | Balance + monthly summary         |
//! | POST   | `/api/proofs`                     | Submit a payment proof            |
//! | GET    | `/api/proofs/:id`                 | Fetch one proof                   |
//! | POST   | `/api/proofs/:id/approve`         | Approve a pending proof           |
//! | POST   | `/api/proofs/:id/reject`          | Reject a proof                    |
//! | GET    | `/api/admin/pending`              | Pending proof queue               |
//! | POST   | `/api/admin/income`               | Manual CREDIT adjustment          |
//! | POST   | `/api/admin/expense`              | Manual DEBIT adjustment           |
//! | POST   | `/api/admin/reset-balance`        | Zero the balance                  |
//! | POST   | `/api/admin/wipe`                 | Delete all ledger rows            |
//! | POST   | `/api/requests`                   | Submit an account request         |
//! | GET    | `/api/admin/requests`             | List account requests             |
//! | POST   | `/api/admin/requests/:id/approve` | Create user, delete request       |
//! | POST   | `/api/admin/requests/:id/reject`  | Delete request                    |
//! | GET    | `/api/notifications`              | Feed + unread count               |
//! | POST   | `/api/notifications/read-all`     | Mark a feed read                  |
//!
//! There is no session layer. Privileged routes name the acting user in a
//! `reviewer` field and the domain workflows refuse anyone who is not a
//! TREASURER or ADMIN.

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use kas_ledger::ledger::entry::EntryKind;
use kas_ledger::ledger::month::Month;
use kas_ledger::ledger::reconcile::{self, LedgerError};
use kas_ledger::ledger::summary;
use kas_ledger::member::request::{self as requests, NewRequest, RequestError};
use kas_ledger::member::user::{ReviewError, Role};
use kas_ledger::notify::{self, NotificationScope};
use kas_ledger::proof::workflow::{self, NewProof, ProofError};
use kas_ledger::storage::db::KasDb;

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The server's reported version string.
    pub version: String,
    /// Persistent storage for the fund.
    pub db: Arc<KasDb>,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

impl AppState {
    /// Re-derives the balance gauge after a ledger mutation.
    fn refresh_balance_gauge(&self) {
        match summary::balance(&self.db) {
            Ok(balance) => self.metrics.fund_balance.set(balance),
            Err(e) => tracing::warn!("failed to refresh balance gauge: {}", e),
        }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/public/summary", get(summary_handler))
        .route("/api/proofs", post(submit_proof_handler))
        .route("/api/proofs/:id", get(get_proof_handler))
        .route("/api/proofs/:id/approve", post(approve_proof_handler))
        .route("/api/proofs/:id/reject", post(reject_proof_handler))
        .route("/api/admin/pending", get(pending_proofs_handler))
        .route("/api/admin/income", post(income_handler))
        .route("/api/admin/expense", post(expense_handler))
        .route("/api/admin/reset-balance", post(reset_balance_handler))
        .route("/api/admin/wipe", post(wipe_handler))
        .route("/api/requests", post(submit_request_handler))
        .route("/api/admin/requests", get(list_requests_handler))
        .route(
            "/api/admin/requests/:id/approve",
            post(approve_request_handler),
        )
        .route(
            "/api/admin/requests/:id/reject",
            post(reject_request_handler),
        )
        .route("/api/notifications", get(notifications_handler))
        .route("/api/notifications/read-all", post(read_all_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Generic error body returned by all endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Query parameters for `GET /api/public/summary`.
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// Month filter in `YYYY-MM` form. Empty or absent means the current
    /// month, with an unfiltered recent feed.
    pub month: Option<String>,
}

/// Body for `POST /api/proofs`.
#[derive(Debug, Deserialize)]
pub struct SubmitProofRequest {
    pub user_id: Uuid,
    pub amount: Option<i64>,
    pub transfer_at: Option<DateTime<Utc>>,
    pub bank_name: Option<String>,
    pub account_last4: Option<String>,
    pub screenshot_path: String,
    pub checksum: String,
}

/// Response for `POST /api/proofs`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitProofResponse {
    pub ok: bool,
    pub id: Uuid,
    pub message: String,
}

/// Body for `POST /api/proofs/:id/approve`.
#[derive(Debug, Deserialize)]
pub struct ApproveProofRequest {
    /// The acting treasurer/admin.
    pub reviewer: Uuid,
    /// Amount override, used only when the proof was submitted blank.
    pub amount: Option<i64>,
}

/// Response for `POST /api/proofs/:id/approve`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApproveProofResponse {
    pub ok: bool,
    /// The amount booked on the ledger.
    pub amount: i64,
}

/// Body for `POST /api/proofs/:id/reject`.
#[derive(Debug, Deserialize)]
pub struct RejectProofRequest {
    pub reviewer: Uuid,
    pub notes: Option<String>,
}

/// Query naming the acting reviewer on privileged GET routes.
#[derive(Debug, Deserialize)]
pub struct ReviewerQuery {
    pub reviewer: Uuid,
}

/// Body for manual income/expense adjustments.
#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    pub reviewer: Uuid,
    pub amount: i64,
    pub note: Option<String>,
}

/// Body naming only the acting reviewer.
#[derive(Debug, Deserialize)]
pub struct ReviewerBody {
    pub reviewer: Uuid,
}

/// The counter-entry a balance reset applied.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppliedAdjustment {
    pub kind: EntryKind,
    pub amount: i64,
}

/// Response for `POST /api/admin/reset-balance`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetBalanceResponse {
    pub ok: bool,
    /// The adjustment written, absent when the balance was already zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<AppliedAdjustment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Response for `POST /api/admin/wipe`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WipeResponse {
    pub ok: bool,
    pub removed: u64,
}

/// Body for `POST /api/admin/requests/:id/approve`.
#[derive(Debug, Deserialize)]
pub struct ApproveRequestBody {
    pub reviewer: Uuid,
    /// Role granted to the new user. MEMBER when absent.
    pub role: Option<Role>,
}

/// Response for `POST /api/admin/requests/:id/approve`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApproveRequestResponse {
    pub ok: bool,
    pub user_id: Uuid,
}

/// Query for `GET /api/notifications`: a member's feed when `user_id` is
/// given, the shared admin feed otherwise.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub user_id: Option<Uuid>,
}

/// Response for `POST /api/notifications/read-all`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadAllResponse {
    pub ok: bool,
    pub marked: u64,
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn review_status(err: &ReviewError) -> StatusCode {
    match err {
        ReviewError::UnknownReviewer(_) | ReviewError::Forbidden(_) => StatusCode::FORBIDDEN,
        ReviewError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn proof_error(err: ProofError) -> Response {
    let status = match &err {
        ProofError::InvalidAmount
        | ProofError::InvalidChecksum
        | ProofError::MissingScreenshot
        | ProofError::NotPending(_)
        | ProofError::AlreadyRejected
        | ProofError::AmountMissing => StatusCode::BAD_REQUEST,
        ProofError::DuplicateChecksum(_) => StatusCode::CONFLICT,
        ProofError::UnknownUser(_) | ProofError::NotFound(_) => StatusCode::NOT_FOUND,
        ProofError::Review(e) => review_status(e),
        ProofError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn ledger_error(err: LedgerError) -> Response {
    let status = match &err {
        LedgerError::InvalidAmount => StatusCode::BAD_REQUEST,
        LedgerError::Review(e) => review_status(e),
        LedgerError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn request_error(err: RequestError) -> Response {
    let status = match &err {
        RequestError::MissingField(_) => StatusCode::BAD_REQUEST,
        RequestError::DuplicateEmail(_) => StatusCode::CONFLICT,
        RequestError::NotFound(_) => StatusCode::NOT_FOUND,
        RequestError::Review(e) => review_status(e),
        RequestError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn db_error(err: kas_ledger::storage::db::DbError) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

// ---------------------------------------------------------------------------
// Handlers — Public
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the server is alive.
///
/// This is the liveness probe for orchestrators. It intentionally does not
/// touch storage — a wedged database shows up in `/metrics`, not here.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "version": state.version }))
}

/// `GET /api/public/summary` — the fund at a glance.
///
/// Returns the all-time balance, one month's credit/debit/net, and the
/// most recent entries. `?month=YYYY-MM` selects the month; anything else
/// is a 400.
async fn summary_handler(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Response {
    let month = match query.month.as_deref().filter(|m| !m.is_empty()) {
        Some(raw) => match raw.parse::<Month>() {
            Ok(m) => Some(m),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
        None => None,
    };

    let timer = state.metrics.summary_latency_seconds.start_timer();
    let result = summary::summary(&state.db, month);
    timer.observe_duration();

    match result {
        Ok(report) => {
            state.metrics.fund_balance.set(report.total_all_time);
            Json(report).into_response()
        }
        Err(e) => db_error(e),
    }
}

// ---------------------------------------------------------------------------
// Handlers — Proofs
// ---------------------------------------------------------------------------

/// `POST /api/proofs` — submit a payment proof for review.
async fn submit_proof_handler(
    State(state): State<AppState>,
    Json(body): Json<SubmitProofRequest>,
) -> Response {
    let input = NewProof {
        user_id: body.user_id,
        amount: body.amount,
        transfer_at: body.transfer_at,
        bank_name: body.bank_name,
        account_last4: body.account_last4,
        screenshot_path: body.screenshot_path,
        checksum: body.checksum,
    };

    match workflow::submit_proof(&state.db, input) {
        Ok(proof) => {
            state.metrics.proofs_submitted_total.inc();
            Json(SubmitProofResponse {
                ok: true,
                id: proof.id,
                message: "proof submitted, awaiting verification".into(),
            })
            .into_response()
        }
        Err(e) => proof_error(e),
    }
}

/// `GET /api/proofs/:id` — fetch one proof by id.
async fn get_proof_handler(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    match state.db.get_proof(id) {
        Ok(Some(proof)) => Json(proof).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("proof not found: {id}")),
        Err(e) => db_error(e),
    }
}

/// `POST /api/proofs/:id/approve` — approve a pending proof and book its
/// amount as a CREDIT.
async fn approve_proof_handler(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<ApproveProofRequest>,
) -> Response {
    match workflow::approve_proof(&state.db, id, body.reviewer, body.amount) {
        Ok((_, entry)) => {
            state.metrics.proofs_approved_total.inc();
            state.metrics.ledger_entries_total.inc();
            state.refresh_balance_gauge();
            Json(ApproveProofResponse {
                ok: true,
                amount: entry.amount,
            })
            .into_response()
        }
        Err(e) => proof_error(e),
    }
}

/// `POST /api/proofs/:id/reject` — reject a proof, undoing its booking if
/// it had one.
async fn reject_proof_handler(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<RejectProofRequest>,
) -> Response {
    match workflow::reject_proof(&state.db, id, body.reviewer, body.notes) {
        Ok(_) => {
            state.metrics.proofs_rejected_total.inc();
            state.refresh_balance_gauge();
            Json(serde_json::json!({ "ok": true })).into_response()
        }
        Err(e) => proof_error(e),
    }
}

/// `GET /api/admin/pending` — the review queue, oldest first, with member
/// names joined in.
async fn pending_proofs_handler(
    State(state): State<AppState>,
    Query(query): Query<ReviewerQuery>,
) -> Response {
    match workflow::list_pending(&state.db, query.reviewer) {
        Ok(queue) => Json(serde_json::json!({ "items": queue })).into_response(),
        Err(e) => proof_error(e),
    }
}

// ---------------------------------------------------------------------------
// Handlers — Ledger Administration
// ---------------------------------------------------------------------------

/// `POST /api/admin/income` — record a manual CREDIT (cash handed to the
/// treasurer).
async fn income_handler(
    State(state): State<AppState>,
    Json(body): Json<AdjustmentRequest>,
) -> Response {
    match reconcile::record_income(&state.db, body.reviewer, body.amount, body.note) {
        Ok(entry) => {
            state.metrics.ledger_entries_total.inc();
            state.refresh_balance_gauge();
            Json(serde_json::json!({ "ok": true, "id": entry.id })).into_response()
        }
        Err(e) => ledger_error(e),
    }
}

/// `POST /api/admin/expense` — record a manual DEBIT (a fund expense).
async fn expense_handler(
    State(state): State<AppState>,
    Json(body): Json<AdjustmentRequest>,
) -> Response {
    match reconcile::record_expense(&state.db, body.reviewer, body.amount, body.note) {
        Ok(entry) => {
            state.metrics.ledger_entries_total.inc();
            state.refresh_balance_gauge();
            Json(serde_json::json!({ "ok": true, "id": entry.id })).into_response()
        }
        Err(e) => ledger_error(e),
    }
}

/// `POST /api/admin/reset-balance` — insert the counter-entry that zeroes
/// the balance. A zero balance writes nothing and says so.
async fn reset_balance_handler(
    State(state): State<AppState>,
    Json(body): Json<ReviewerBody>,
) -> Response {
    match reconcile::reset_balance(&state.db, body.reviewer) {
        Ok(Some(entry)) => {
            state.metrics.ledger_entries_total.inc();
            state.refresh_balance_gauge();
            Json(ResetBalanceResponse {
                ok: true,
                applied: Some(AppliedAdjustment {
                    kind: entry.kind,
                    amount: entry.amount,
                }),
                note: None,
            })
            .into_response()
        }
        Ok(None) => Json(ResetBalanceResponse {
            ok: true,
            applied: None,
            note: Some("balance already zero".into()),
        })
        .into_response(),
        Err(e) => ledger_error(e),
    }
}

/// `POST /api/admin/wipe` — delete every ledger row.
async fn wipe_handler(State(state): State<AppState>, Json(body): Json<ReviewerBody>) -> Response {
    match reconcile::wipe(&state.db, body.reviewer) {
        Ok(removed) => {
            state.refresh_balance_gauge();
            Json(WipeResponse { ok: true, removed }).into_response()
        }
        Err(e) => ledger_error(e),
    }
}

// ---------------------------------------------------------------------------
// Handlers — Membership
// ---------------------------------------------------------------------------

/// `POST /api/requests` — ask for an account.
async fn submit_request_handler(
    State(state): State<AppState>,
    Json(body): Json<NewRequest>,
) -> Response {
    match requests::submit_request(&state.db, body) {
        Ok(request) => Json(serde_json::json!({ "ok": true, "id": request.id })).into_response(),
        Err(e) => request_error(e),
    }
}

/// `GET /api/admin/requests` — the membership review queue, oldest first.
async fn list_requests_handler(
    State(state): State<AppState>,
    Query(query): Query<ReviewerQuery>,
) -> Response {
    match requests::list_requests(&state.db, query.reviewer) {
        Ok(items) => Json(serde_json::json!({ "items": items })).into_response(),
        Err(e) => request_error(e),
    }
}

/// `POST /api/admin/requests/:id/approve` — create the user, delete the
/// request.
async fn approve_request_handler(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<ApproveRequestBody>,
) -> Response {
    match requests::approve_request(&state.db, id, body.reviewer, body.role) {
        Ok(user) => Json(ApproveRequestResponse {
            ok: true,
            user_id: user.id,
        })
        .into_response(),
        Err(e) => request_error(e),
    }
}

/// `POST /api/admin/requests/:id/reject` — drop the request without
/// creating a user.
async fn reject_request_handler(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<ReviewerBody>,
) -> Response {
    match requests::reject_request(&state.db, id, body.reviewer) {
        Ok(()) => Json(serde_json::json!({ "ok": true })).into_response(),
        Err(e) => request_error(e),
    }
}

// ---------------------------------------------------------------------------
// Handlers — Notifications
// ---------------------------------------------------------------------------

fn feed_scope(user_id: Option<Uuid>) -> NotificationScope {
    match user_id {
        Some(id) => NotificationScope::User(id),
        None => NotificationScope::Admin,
    }
}

/// `GET /api/notifications` — a feed page with its unread count.
async fn notifications_handler(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Response {
    match notify::list(&state.db, feed_scope(query.user_id)) {
        Ok(feed) => Json(feed).into_response(),
        Err(e) => db_error(e),
    }
}

/// `POST /api/notifications/read-all` — flip every unread notice in the
/// scope. Send `{}` for the admin feed.
async fn read_all_handler(
    State(state): State<AppState>,
    Json(body): Json<FeedQuery>,
) -> Response {
    match notify::mark_all_read(&state.db, feed_scope(body.user_id)) {
        Ok(marked) => Json(ReadAllResponse { ok: true, marked }).into_response(),
        Err(e) => db_error(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use kas_ledger::ledger::summary::Summary;
    use kas_ledger::member::{Role, User};
    use kas_ledger::proof::types::sha256_hex;
    use tower::ServiceExt;

    /// Creates a test AppState backed by a temporary in-memory database,
    /// with one admin and one member already seated.
    fn test_state() -> (AppState, User, User) {
        let db = Arc::new(KasDb::open_temporary().expect("temp db"));
        let admin = User::new("Pak RT", Role::Admin);
        let member = User::new("Budi", Role::Member);
        db.put_user(&admin).unwrap();
        db.put_user(&member).unwrap();

        let state = AppState {
            version: "0.1.0-test".into(),
            db,
            metrics: Arc::new(crate::metrics::FundMetrics::new()),
        };
        (state, admin, member)
    }

    /// Sends a GET request and returns (status, body_bytes).
    async fn get_req(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    /// Sends a POST request with a JSON body and returns (status, body_bytes).
    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    fn proof_body(member: &User, amount: i64, evidence: &[u8]) -> serde_json::Value {
        serde_json::json!({
            "user_id": member.id,
            "amount": amount,
            "bank_name": "BCA",
            "account_last4": "4242",
            "screenshot_path": format!("{}/bukti.jpg", member.id),
            "checksum": sha256_hex(evidence),
        })
    }

    /// Submits a proof via the API and returns its id.
    async fn submit_proof(router: &Router, member: &User, amount: i64, evidence: &[u8]) -> Uuid {
        let (status, body) = post_json(router, "/api/proofs", proof_body(member, amount, evidence)).await;
        assert_eq!(status, StatusCode::OK);
        let resp: SubmitProofResponse = serde_json::from_slice(&body).unwrap();
        assert!(resp.ok);
        resp.id
    }

    // -- 1. Health ----------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (state, _, _) = test_state();
        let router = create_router(state);
        let (status, body) = get_req(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], "0.1.0-test");
    }

    // -- 2. Summary ---------------------------------------------------------

    #[tokio::test]
    async fn summary_reflects_approved_deposits() {
        let (state, admin, member) = test_state();
        let router = create_router(state);

        let proof_id = submit_proof(&router, &member, 50_000, b"jan").await;
        let (status, _) = post_json(
            &router,
            &format!("/api/proofs/{proof_id}/approve"),
            serde_json::json!({ "reviewer": admin.id }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get_req(&router, "/api/public/summary").await;
        assert_eq!(status, StatusCode::OK);
        let report: Summary = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.total_all_time, 50_000);
        assert_eq!(report.monthly.credit, 50_000);
        assert_eq!(report.recent.len(), 1);
    }

    #[tokio::test]
    async fn summary_rejects_malformed_month() {
        let (state, _, _) = test_state();
        let router = create_router(state);

        let (status, body) = get_req(&router, "/api/public/summary?month=2026-7").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("YYYY-MM"));
    }

    #[tokio::test]
    async fn summary_filters_by_month() {
        let (state, admin, _) = test_state();
        let router = create_router(state.clone());

        post_json(
            &router,
            "/api/admin/income",
            serde_json::json!({ "reviewer": admin.id, "amount": 9_000 }),
        )
        .await;

        // A month far in the past holds nothing, but the all-time balance
        // still shows.
        let (status, body) = get_req(&router, "/api/public/summary?month=2020-01").await;
        assert_eq!(status, StatusCode::OK);
        let report: Summary = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.total_all_time, 9_000);
        assert_eq!(report.monthly.credit, 0);
        assert!(report.recent.is_empty());
    }

    // -- 3. Proof submission ------------------------------------------------

    #[tokio::test]
    async fn duplicate_checksum_returns_conflict() {
        let (state, _, member) = test_state();
        let router = create_router(state);

        submit_proof(&router, &member, 100, b"same").await;
        let (status, body) =
            post_json(&router, "/api/proofs", proof_body(&member, 100, b"same")).await;

        assert_eq!(status, StatusCode::CONFLICT);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("duplicate proof"));
    }

    #[tokio::test]
    async fn invalid_submission_returns_bad_request() {
        let (state, _, member) = test_state();
        let router = create_router(state);

        let mut body = proof_body(&member, 100, b"x");
        body["checksum"] = serde_json::json!("nothex");
        let (status, _) = post_json(&router, "/api/proofs", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            post_json(&router, "/api/proofs", proof_body(&member, -5, b"y")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_submitter_returns_not_found() {
        let (state, _, _) = test_state();
        let router = create_router(state);

        let ghost = User::new("Ghost", Role::Member);
        let (status, _) =
            post_json(&router, "/api/proofs", proof_body(&ghost, 100, b"g")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // -- 4. Proof review ----------------------------------------------------

    #[tokio::test]
    async fn approve_twice_returns_bad_request() {
        let (state, admin, member) = test_state();
        let router = create_router(state.clone());

        let proof_id = submit_proof(&router, &member, 10_000, b"twice").await;
        let approve = serde_json::json!({ "reviewer": admin.id });

        let (status, body) =
            post_json(&router, &format!("/api/proofs/{proof_id}/approve"), approve.clone()).await;
        assert_eq!(status, StatusCode::OK);
        let resp: ApproveProofResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.amount, 10_000);

        let (status, body) =
            post_json(&router, &format!("/api/proofs/{proof_id}/approve"), approve).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("not PENDING"));

        assert_eq!(state.db.entry_count(), 1);
    }

    #[tokio::test]
    async fn member_cannot_approve() {
        let (state, _, member) = test_state();
        let router = create_router(state);

        let proof_id = submit_proof(&router, &member, 100, b"forbidden").await;
        let (status, body) = post_json(
            &router,
            &format!("/api/proofs/{proof_id}/approve"),
            serde_json::json!({ "reviewer": member.id }),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("forbidden"));
    }

    #[tokio::test]
    async fn approve_missing_proof_returns_not_found() {
        let (state, admin, _) = test_state();
        let router = create_router(state);

        let (status, _) = post_json(
            &router,
            &format!("/api/proofs/{}/approve", Uuid::new_v4()),
            serde_json::json!({ "reviewer": admin.id }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reject_after_approve_restores_balance() {
        let (state, admin, member) = test_state();
        let router = create_router(state.clone());

        let proof_id = submit_proof(&router, &member, 40_000, b"undo").await;
        post_json(
            &router,
            &format!("/api/proofs/{proof_id}/approve"),
            serde_json::json!({ "reviewer": admin.id }),
        )
        .await;

        let (status, _) = post_json(
            &router,
            &format!("/api/proofs/{proof_id}/reject"),
            serde_json::json!({ "reviewer": admin.id, "notes": "no matching transfer" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = get_req(&router, "/api/public/summary").await;
        let report: Summary = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.total_all_time, 0);
    }

    #[tokio::test]
    async fn pending_queue_requires_reviewer() {
        let (state, admin, member) = test_state();
        let router = create_router(state);

        submit_proof(&router, &member, 100, b"q").await;

        let (status, body) =
            get_req(&router, &format!("/api/admin/pending?reviewer={}", admin.id)).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["items"].as_array().unwrap().len(), 1);
        assert_eq!(json["items"][0]["member_name"], "Budi");

        let (status, _) =
            get_req(&router, &format!("/api/admin/pending?reviewer={}", member.id)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    // -- 5. Ledger administration --------------------------------------------

    #[tokio::test]
    async fn income_and_expense_move_balance() {
        let (state, admin, _) = test_state();
        let router = create_router(state);

        let (status, _) = post_json(
            &router,
            "/api/admin/income",
            serde_json::json!({ "reviewer": admin.id, "amount": 30_000 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = post_json(
            &router,
            "/api/admin/expense",
            serde_json::json!({ "reviewer": admin.id, "amount": 12_000, "note": "paint" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = get_req(&router, "/api/public/summary").await;
        let report: Summary = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.total_all_time, 18_000);
    }

    #[tokio::test]
    async fn reset_balance_applies_counter_entry_then_noops() {
        let (state, admin, _) = test_state();
        let router = create_router(state);

        post_json(
            &router,
            "/api/admin/income",
            serde_json::json!({ "reviewer": admin.id, "amount": 77_000 }),
        )
        .await;

        let reset = serde_json::json!({ "reviewer": admin.id });
        let (status, body) =
            post_json(&router, "/api/admin/reset-balance", reset.clone()).await;
        assert_eq!(status, StatusCode::OK);
        let resp: ResetBalanceResponse = serde_json::from_slice(&body).unwrap();
        let applied = resp.applied.expect("nonzero balance applies an entry");
        assert_eq!(applied.kind, EntryKind::Debit);
        assert_eq!(applied.amount, 77_000);

        // Second reset finds a zero balance.
        let (status, body) = post_json(&router, "/api/admin/reset-balance", reset).await;
        assert_eq!(status, StatusCode::OK);
        let resp: ResetBalanceResponse = serde_json::from_slice(&body).unwrap();
        assert!(resp.applied.is_none());
        assert_eq!(resp.note.as_deref(), Some("balance already zero"));
    }

    #[tokio::test]
    async fn wipe_reports_removed_rows() {
        let (state, admin, _) = test_state();
        let router = create_router(state);

        for amount in [1_000, 2_000] {
            post_json(
                &router,
                "/api/admin/income",
                serde_json::json!({ "reviewer": admin.id, "amount": amount }),
            )
            .await;
        }

        let (status, body) = post_json(
            &router,
            "/api/admin/wipe",
            serde_json::json!({ "reviewer": admin.id }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let resp: WipeResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.removed, 2);
    }

    // -- 6. Membership -------------------------------------------------------

    #[tokio::test]
    async fn account_request_lifecycle() {
        let (state, admin, _) = test_state();
        let router = create_router(state.clone());

        let (status, body) = post_json(
            &router,
            "/api/requests",
            serde_json::json!({
                "full_name": "Citra Dewi",
                "email": "citra@example.com",
                "password": "rahasia",
                "whatsapp": "+62812999888",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let request_id = json["id"].as_str().unwrap().to_string();

        let (status, body) =
            get_req(&router, &format!("/api/admin/requests?reviewer={}", admin.id)).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["items"].as_array().unwrap().len(), 1);

        let (status, body) = post_json(
            &router,
            &format!("/api/admin/requests/{request_id}/approve"),
            serde_json::json!({ "reviewer": admin.id, "role": "TREASURER" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let resp: ApproveRequestResponse = serde_json::from_slice(&body).unwrap();

        let user = state.db.get_user(resp.user_id).unwrap().unwrap();
        assert_eq!(user.full_name, "Citra Dewi");
        assert_eq!(user.role, Role::Treasurer);
        assert_eq!(state.db.request_count(), 0);

        // Approving again: the request is gone.
        let (status, _) = post_json(
            &router,
            &format!("/api/admin/requests/{request_id}/approve"),
            serde_json::json!({ "reviewer": admin.id }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejected_request_creates_no_user() {
        let (state, admin, _) = test_state();
        let router = create_router(state.clone());
        let users_before = state.db.user_count();

        let (_, body) = post_json(
            &router,
            "/api/requests",
            serde_json::json!({
                "full_name": "Agus",
                "email": "agus@example.com",
                "password": "pw",
            }),
        )
        .await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let request_id = json["id"].as_str().unwrap().to_string();

        let (status, _) = post_json(
            &router,
            &format!("/api/admin/requests/{request_id}/reject"),
            serde_json::json!({ "reviewer": admin.id }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.db.user_count(), users_before);
        assert_eq!(state.db.request_count(), 0);
    }

    // -- 7. Notifications ----------------------------------------------------

    #[tokio::test]
    async fn notification_feeds_and_read_all() {
        let (state, admin, member) = test_state();
        let router = create_router(state);

        // A submission notifies the admin feed.
        let proof_id = submit_proof(&router, &member, 5_000, b"notify").await;
        let (status, body) = get_req(&router, "/api/notifications").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["unread"], 1);

        // Approval notifies the member's feed.
        post_json(
            &router,
            &format!("/api/proofs/{proof_id}/approve"),
            serde_json::json!({ "reviewer": admin.id }),
        )
        .await;
        let (_, body) =
            get_req(&router, &format!("/api/notifications?user_id={}", member.id)).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["unread"], 1);
        assert_eq!(json["items"][0]["kind"], "PROOF_APPROVED");

        // Mark the member's feed read; the admin feed is untouched.
        let (status, body) = post_json(
            &router,
            "/api/notifications/read-all",
            serde_json::json!({ "user_id": member.id }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let resp: ReadAllResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.marked, 1);

        let (_, body) =
            get_req(&router, &format!("/api/notifications?user_id={}", member.id)).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["unread"], 0);

        let (_, body) = get_req(&router, "/api/notifications").await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["unread"], 1);
    }
}
