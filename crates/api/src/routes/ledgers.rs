//! Lead ledger routes.
//!
//! Every handler turns the authenticated claims into a [`Caller`], hands
//! the request to the ledger repository, and renders the outcome. Rule
//! rejections come back as `{"error": <CODE>, "message": <text>}` with the
//! status the error kind maps to.
//!
//! [`Caller`]: dealflow_core::reconcile::Caller

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::{
    AppState,
    middleware::{ApiJson, ApiPath, ApiQuery, AuthUser},
};
use dealflow_core::reconcile::{
    Attachment, Decision, LedgerError, LedgerStatus, ReviewSide, Track,
};
use dealflow_db::repositories::{
    NewDocumentEntry, NewLedger, NewPaymentEntry, ReviewDocument, VerifyPayment,
};
use dealflow_shared::types::PageRequest;

/// Media type recorded when a payment attachment arrives without one.
const DEFAULT_ATTACHMENT_TYPE: &str = "application/octet-stream";

/// Creates the ledger routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ledgers", get(list_ledgers).post(open_ledger))
        .route(
            "/ledgers/{lead_id}",
            get(get_ledger).patch(update_ledger_info),
        )
        .route("/ledgers/{lead_id}/audit", get(audit_accumulator))
        .route("/ledgers/{lead_id}/payments", post(submit_payment))
        .route("/ledgers/{lead_id}/documents", post(submit_document))
        .route(
            "/ledgers/{lead_id}/closures/{track}/request",
            post(request_closure),
        )
        .route(
            "/ledgers/{lead_id}/closures/{track}/authorize",
            post(authorize_closure),
        )
        .route("/payments/{entry_id}/verify", post(verify_payment))
        .route("/documents/{entry_id}/review", post(review_document))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for opening a ledger.
#[derive(Debug, Deserialize)]
pub struct OpenLedgerRequest {
    /// CRM lead id.
    pub lead_id: Uuid,
    /// Lead title.
    pub title: String,
    /// Customer display name.
    pub customer_name: Option<String>,
}

/// Query parameters for listing ledgers.
#[derive(Debug, Deserialize)]
pub struct ListLedgersQuery {
    /// `active` or `closed`.
    pub status: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

/// Request body for updating ledger info.
#[derive(Debug, Deserialize)]
pub struct UpdateLedgerRequest {
    /// Free-form payment timeline; null or blank clears it.
    pub payment_timeline: Option<String>,
}

/// Request body for submitting a payment entry.
#[derive(Debug, Deserialize)]
pub struct SubmitPaymentRequest {
    /// Amount received; must be positive.
    pub amount: Decimal,
    /// Free-form note.
    #[serde(default)]
    pub note: String,
    /// Public URL of the uploaded receipt.
    pub attachment_url: Option<String>,
    /// Media type of the receipt.
    pub attachment_type: Option<String>,
}

/// Request body for verifying a payment entry.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    /// `approved` or `rejected`.
    pub decision: String,
    /// Required when rejecting.
    pub finance_notes: Option<String>,
}

/// Request body for submitting a document entry.
#[derive(Debug, Deserialize)]
pub struct SubmitDocumentRequest {
    /// Free-form note.
    #[serde(default)]
    pub note: String,
    /// Public URL of the uploaded document.
    pub attachment_url: String,
    /// Media type of the document.
    pub attachment_type: String,
}

/// Request body for reviewing a document entry.
#[derive(Debug, Deserialize)]
pub struct ReviewDocumentRequest {
    /// Side the caller acts for: `sales` or `finance`.
    pub side: String,
    /// `approved` or `rejected`.
    pub decision: String,
    /// Required when rejecting.
    pub notes: Option<String>,
}

/// Request body for phase 1 of closure.
#[derive(Debug, Default, Deserialize)]
pub struct RequestClosureRequest {
    /// Optional closure notes.
    pub notes: Option<String>,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Renders a ledger error with the status its kind maps to.
pub(crate) fn ledger_error(e: &LedgerError) -> Response {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = if status.is_server_error() {
        "An internal error occurred".to_string()
    } else {
        warn!(code = e.error_code(), error = %e, "ledger request rejected");
        e.to_string()
    };

    (
        status,
        Json(json!({
            "error": e.error_code(),
            "message": message
        })),
    )
        .into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, LedgerError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => ledger_error(&e),
    }
}

fn parse_track(s: &str) -> Result<Track, LedgerError> {
    Track::parse(s).ok_or_else(|| {
        LedgerError::InvalidInput(format!("unknown track '{s}', expected payment or document"))
    })
}

fn parse_decision(s: &str) -> Result<Decision, LedgerError> {
    Decision::parse(s).ok_or_else(|| {
        LedgerError::InvalidInput(format!("unknown decision '{s}', expected approved or rejected"))
    })
}

fn parse_side(s: &str) -> Result<ReviewSide, LedgerError> {
    ReviewSide::parse(s).ok_or_else(|| {
        LedgerError::InvalidInput(format!("unknown side '{s}', expected sales or finance"))
    })
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/ledgers` - Open the ledger of a converted lead.
async fn open_ledger(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<OpenLedgerRequest>,
) -> Response {
    let input = NewLedger {
        lead_id: payload.lead_id,
        title: payload.title,
        customer_name: payload.customer_name,
    };
    respond(
        StatusCode::CREATED,
        state.ledger.open_ledger(&auth.caller(), input).await,
    )
}

/// GET `/ledgers` - List ledgers, newest first.
async fn list_ledgers(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListLedgersQuery>,
) -> Response {
    let status = match query.status.as_deref() {
        None => None,
        Some(s) => match LedgerStatus::parse(s) {
            Some(status) => Some(status),
            None => {
                return ledger_error(&LedgerError::InvalidInput(format!(
                    "unknown status '{s}', expected active or closed"
                )));
            }
        },
    };

    let defaults = PageRequest::default();
    let page = PageRequest {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };

    respond(
        StatusCode::OK,
        state.ledger.list_ledgers(&auth.caller(), status, page).await,
    )
}

/// GET `/ledgers/{lead_id}` - Lead, entries and summary.
async fn get_ledger(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(lead_id): ApiPath<Uuid>,
) -> Response {
    respond(
        StatusCode::OK,
        state.ledger.get_ledger(&auth.caller(), lead_id).await,
    )
}

/// PATCH `/ledgers/{lead_id}` - Replace the payment timeline.
async fn update_ledger_info(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(lead_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateLedgerRequest>,
) -> Response {
    respond(
        StatusCode::OK,
        state
            .ledger
            .update_ledger_info(&auth.caller(), lead_id, payload.payment_timeline)
            .await,
    )
}

/// GET `/ledgers/{lead_id}/audit` - Recompute and compare the accumulator.
async fn audit_accumulator(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(lead_id): ApiPath<Uuid>,
) -> Response {
    respond(
        StatusCode::OK,
        state.ledger.audit_accumulator(&auth.caller(), lead_id).await,
    )
}

/// POST `/ledgers/{lead_id}/payments` - Submit a payment entry.
async fn submit_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(lead_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<SubmitPaymentRequest>,
) -> Response {
    let attachment = payload.attachment_url.map(|url| Attachment {
        url,
        media_type: payload
            .attachment_type
            .unwrap_or_else(|| DEFAULT_ATTACHMENT_TYPE.to_string()),
    });
    let input = NewPaymentEntry {
        amount: payload.amount,
        note: payload.note,
        attachment,
    };
    respond(
        StatusCode::CREATED,
        state
            .ledger
            .submit_payment_entry(&auth.caller(), lead_id, input)
            .await,
    )
}

/// POST `/payments/{entry_id}/verify` - Approve or reject a payment entry.
async fn verify_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(entry_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<VerifyPaymentRequest>,
) -> Response {
    let decision = match parse_decision(&payload.decision) {
        Ok(decision) => decision,
        Err(e) => return ledger_error(&e),
    };
    let input = VerifyPayment {
        decision,
        finance_notes: payload.finance_notes,
    };
    respond(
        StatusCode::OK,
        state
            .ledger
            .verify_payment_entry(&auth.caller(), entry_id, input)
            .await,
    )
}

/// POST `/ledgers/{lead_id}/documents` - Submit a document entry.
async fn submit_document(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(lead_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<SubmitDocumentRequest>,
) -> Response {
    let input = NewDocumentEntry {
        note: payload.note,
        attachment: Attachment {
            url: payload.attachment_url,
            media_type: payload.attachment_type,
        },
    };
    respond(
        StatusCode::CREATED,
        state
            .ledger
            .submit_document_entry(&auth.caller(), lead_id, input)
            .await,
    )
}

/// POST `/documents/{entry_id}/review` - Review a document entry for one side.
async fn review_document(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(entry_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ReviewDocumentRequest>,
) -> Response {
    let parsed = parse_side(&payload.side)
        .and_then(|side| parse_decision(&payload.decision).map(|decision| (side, decision)));
    let (side, decision) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return ledger_error(&e),
    };
    let input = ReviewDocument {
        side,
        decision,
        notes: payload.notes,
    };
    respond(
        StatusCode::OK,
        state
            .ledger
            .review_document_entry(&auth.caller(), entry_id, input)
            .await,
    )
}

/// POST `/ledgers/{lead_id}/closures/{track}/request` - Phase 1 of closure.
async fn request_closure(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((lead_id, track)): ApiPath<(Uuid, String)>,
    payload: Option<ApiJson<RequestClosureRequest>>,
) -> Response {
    let track = match parse_track(&track) {
        Ok(track) => track,
        Err(e) => return ledger_error(&e),
    };
    let ApiJson(payload) = payload.unwrap_or_default();
    respond(
        StatusCode::OK,
        state
            .ledger
            .request_closure(&auth.caller(), lead_id, track, payload.notes)
            .await,
    )
}

/// POST `/ledgers/{lead_id}/closures/{track}/authorize` - Phase 2 of closure.
async fn authorize_closure(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((lead_id, track)): ApiPath<(Uuid, String)>,
) -> Response {
    let track = match parse_track(&track) {
        Ok(track) => track,
        Err(e) => return ledger_error(&e),
    };
    respond(
        StatusCode::OK,
        state
            .ledger
            .authorize_closure(&auth.caller(), lead_id, track)
            .await,
    )
}
