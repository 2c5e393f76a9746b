//! Ledger repository: the lead aggregate and its read models.
//!
//! Every mutating operation follows the same shape: gate the caller, load
//! the persisted state, ask the core rules for the transition, apply it as
//! one atomic store mutation, notify after commit. Entry operations live in
//! the sibling `payment`, `document` and `closure` modules as further
//! `impl LedgerRepository` blocks.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, SimpleExpr},
};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use dealflow_core::reconcile::{
    Action, Caller, ClosureCoordinator, LedgerError, LedgerEvent, LedgerNotifier, LedgerStatus,
    NoopNotifier, PaymentReconciler, Track, types::normalize_notes,
};
use dealflow_shared::types::{PageRequest, PageResponse};

use crate::entities::{
    document_entries,
    leads::{self, TrackColumns},
    payment_entries,
    sea_orm_active_enums::{EntryStatus as DbEntryStatus, LedgerStatus as DbLedgerStatus},
};

use super::summary::LedgerSummary;

/// Attempts a verify/review compare-and-swap makes before giving up.
pub const MAX_CAS_ATTEMPTS: u32 = 5;

/// Input for opening a ledger on a converted lead.
#[derive(Debug, Clone)]
pub struct NewLedger {
    /// The lead id from the CRM.
    pub lead_id: Uuid,
    /// Lead title.
    pub title: String,
    /// Customer display name.
    pub customer_name: Option<String>,
}

/// A lead with all its entries and the derived summary.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerView {
    /// The lead row.
    pub lead: leads::Model,
    /// Payment entries, oldest first.
    pub payments: Vec<payment_entries::Model>,
    /// Document entries, oldest first.
    pub documents: Vec<document_entries::Model>,
    /// Counts, pending amount and closure phases.
    pub summary: LedgerSummary,
}

/// Result of re-deriving the accumulator by full scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccumulatorAudit {
    /// The lead.
    pub lead_id: Uuid,
    /// `total_amount_to_credit` as stored.
    pub recorded: Decimal,
    /// Sum of APPROVED payment amounts.
    pub computed: Decimal,
    /// `recorded - computed`.
    pub drift: Decimal,
}

impl AccumulatorAudit {
    /// True when the stored accumulator matches the approved set.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.drift.is_zero()
    }
}

/// Ledger repository over the lead, payment and document tables.
#[derive(Clone)]
pub struct LedgerRepository {
    pub(super) db: DatabaseConnection,
    pub(super) notifier: Arc<dyn LedgerNotifier>,
}

impl fmt::Debug for LedgerRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerRepository")
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}

impl LedgerRepository {
    /// Creates a new ledger repository that drops notifications.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            notifier: Arc::new(NoopNotifier),
        }
    }

    /// Routes post-commit events to `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn LedgerNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Opens a ledger for a converted lead: zero accumulator, both tracks
    /// open, status ACTIVE.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The caller may not open ledgers
    /// - The title is blank
    /// - A ledger already exists for the lead
    /// - Database operation fails
    pub async fn open_ledger(
        &self,
        caller: &Caller,
        input: NewLedger,
    ) -> Result<leads::Model, LedgerError> {
        caller.require(Action::OpenLedger)?;

        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(LedgerError::InvalidInput("title must not be blank".into()));
        }

        let existing = leads::Entity::find_by_id(input.lead_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            return Err(LedgerError::LedgerAlreadyOpen(input.lead_id));
        }

        let now = Utc::now().into();
        let lead = leads::ActiveModel {
            id: Set(input.lead_id),
            title: Set(title),
            customer_name: Set(normalize_notes(input.customer_name)),
            total_amount_to_credit: Set(Decimal::ZERO),
            payment_timeline: Set(None),
            payment_ledger_closed_by_sales_id: Set(None),
            payment_ledger_closed_by_finance_id: Set(None),
            payment_ledger_closed_at: Set(None),
            payment_ledger_closure_notes: Set(None),
            document_ledger_closed_by_sales_id: Set(None),
            document_ledger_closed_by_finance_id: Set(None),
            document_ledger_closed_at: Set(None),
            document_ledger_closure_notes: Set(None),
            ledger_status: Set(DbLedgerStatus::Active),
            opened_by: Set(caller.id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // A concurrent open can still win between the lookup and the insert.
        let lead = lead.insert(&self.db).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                LedgerError::LedgerAlreadyOpen(input.lead_id)
            }
            _ => db_err(e),
        })?;

        info!(lead_id = %lead.id, opened_by = %caller.id, "ledger opened");
        self.emit(LedgerEvent::LedgerOpened {
            lead_id: lead.id,
            title: lead.title.clone(),
            opened_by: caller.id,
        });

        Ok(lead)
    }

    /// Loads a lead with its entries and summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller may not view ledgers, the lead does
    /// not exist, or its stored closure columns are inconsistent.
    pub async fn get_ledger(
        &self,
        caller: &Caller,
        lead_id: Uuid,
    ) -> Result<LedgerView, LedgerError> {
        caller.require(Action::ViewLedger)?;

        let lead = find_lead(&self.db, lead_id).await?;

        let payments = payment_entries::Entity::find()
            .filter(payment_entries::Column::LeadId.eq(lead_id))
            .order_by_asc(payment_entries::Column::CreatedAt)
            .order_by_asc(payment_entries::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let documents = document_entries::Entity::find()
            .filter(document_entries::Column::LeadId.eq(lead_id))
            .order_by_asc(document_entries::Column::CreatedAt)
            .order_by_asc(document_entries::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let summary = LedgerSummary::compute(&lead, &payments, &documents)?;

        Ok(LedgerView {
            lead,
            payments,
            documents,
            summary,
        })
    }

    /// Lists leads newest first, optionally filtered by ledger status.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller may not view ledgers or the query
    /// fails.
    pub async fn list_ledgers(
        &self,
        caller: &Caller,
        status: Option<LedgerStatus>,
        page: PageRequest,
    ) -> Result<PageResponse<leads::Model>, LedgerError> {
        caller.require(Action::ViewLedger)?;

        let page = page.normalized();
        let mut query = leads::Entity::find();
        if let Some(status) = status {
            query = query.filter(leads::Column::LedgerStatus.eq(DbLedgerStatus::from(status)));
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let items = query
            .order_by_desc(leads::Column::CreatedAt)
            .order_by_asc(leads::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(PageResponse::new(items, &page, total))
    }

    /// Replaces the free-form payment timeline.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The caller may not edit ledger info
    /// - The lead does not exist
    /// - The payment track is closed
    /// - Database operation fails
    pub async fn update_ledger_info(
        &self,
        caller: &Caller,
        lead_id: Uuid,
        payment_timeline: Option<String>,
    ) -> Result<leads::Model, LedgerError> {
        caller.require(Action::UpdateLedgerInfo)?;

        ensure_track_open(&self.db, lead_id, Track::Payment).await?;

        let timeline = payment_timeline
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        // The closed-at filter keeps a concurrent phase-2 closure from
        // being overwritten.
        let result = leads::Entity::update_many()
            .col_expr(leads::Column::PaymentTimeline, Expr::value(timeline))
            .col_expr(leads::Column::UpdatedAt, now_expr())
            .filter(leads::Column::Id.eq(lead_id))
            .filter(leads::Column::PaymentLedgerClosedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(LedgerError::TrackClosed(Track::Payment));
        }

        info!(lead_id = %lead_id, "payment timeline updated");
        find_lead(&self.db, lead_id).await
    }

    /// Recomputes the approved total by full scan and compares it with the
    /// stored accumulator. Never writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller may not audit, the lead does not
    /// exist, or the query fails.
    pub async fn audit_accumulator(
        &self,
        caller: &Caller,
        lead_id: Uuid,
    ) -> Result<AccumulatorAudit, LedgerError> {
        caller.require(Action::AuditAccumulator)?;

        let lead = find_lead(&self.db, lead_id).await?;
        let entries = payment_entries::Entity::find()
            .filter(payment_entries::Column::LeadId.eq(lead_id))
            .filter(payment_entries::Column::Status.eq(DbEntryStatus::Approved))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let computed = PaymentReconciler::approved_total(
            entries.iter().map(|e| (e.status.into(), e.amount)),
        );
        let audit = AccumulatorAudit {
            lead_id,
            recorded: lead.total_amount_to_credit,
            computed,
            drift: lead.total_amount_to_credit - computed,
        };

        if !audit.is_consistent() {
            error!(
                lead_id = %lead_id,
                recorded = %audit.recorded,
                computed = %audit.computed,
                "accumulator drift detected"
            );
        }

        Ok(audit)
    }

    /// Round-trips to the store.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the store does not answer.
    pub async fn ping(&self) -> Result<(), LedgerError> {
        self.db.ping().await.map_err(db_err)
    }

    pub(super) fn emit(&self, event: LedgerEvent) {
        self.notifier.notify(event);
    }
}

/// Loads a lead or fails with `LeadNotFound`.
pub(super) async fn find_lead<C: ConnectionTrait>(
    conn: &C,
    lead_id: Uuid,
) -> Result<leads::Model, LedgerError> {
    leads::Entity::find_by_id(lead_id)
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::LeadNotFound(lead_id))
}

/// Fails unless `lead_id` exists and `track` is not closed. Read-only.
pub(super) async fn ensure_track_open<C: ConnectionTrait>(
    conn: &C,
    lead_id: Uuid,
    track: Track,
) -> Result<leads::Model, LedgerError> {
    let lead = find_lead(conn, lead_id).await?;
    ClosureCoordinator::ensure_open(track, &lead.closure_state(track)?)?;
    Ok(lead)
}

/// Takes the lead's row lock for the rest of `txn` by touching
/// `updated_at`, provided `track` is not closed, then reads the lead.
///
/// Submissions and closure phases on the same lead serialize on this lock,
/// so a closure guard never counts entries while one is being inserted.
pub(super) async fn lock_open_lead(
    txn: &DatabaseTransaction,
    lead_id: Uuid,
    track: Track,
) -> Result<leads::Model, LedgerError> {
    let touched = leads::Entity::update_many()
        .col_expr(leads::Column::UpdatedAt, now_expr())
        .filter(leads::Column::Id.eq(lead_id))
        .filter(TrackColumns::of(track).closed_at.is_null())
        .exec(txn)
        .await
        .map_err(db_err)?;

    let lead = find_lead(txn, lead_id).await?;
    if touched.rows_affected == 0 {
        return Err(LedgerError::TrackClosed(track));
    }
    lead.closure_state(track)?;
    Ok(lead)
}

/// Current time as an update expression.
pub(super) fn now_expr() -> SimpleExpr {
    let now: DateTimeWithTimeZone = Utc::now().into();
    Expr::value(now)
}

pub(super) fn db_err(e: DbErr) -> LedgerError {
    error!(error = %e, "ledger store failure");
    LedgerError::Database(e.to_string())
}
