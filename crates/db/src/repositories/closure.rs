//! Two-phase closure of a lead's payment and document tracks.

use chrono::Utc;
use sea_orm::{
    ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    TransactionTrait,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, SimpleExpr},
};
use tracing::{info, warn};
use uuid::Uuid;

use dealflow_core::reconcile::{
    Action, Caller, ClosureCoordinator, ClosureState, LedgerError, LedgerEvent, Track,
};

use crate::entities::{
    document_entries,
    leads::{self, TrackColumns},
    payment_entries,
    sea_orm_active_enums::{EntryStatus, LedgerStatus},
};

use super::ledger::{LedgerRepository, db_err, find_lead, lock_open_lead, now_expr};

impl LedgerRepository {
    /// Phase 1: Sales asks Finance to close `track`.
    ///
    /// Requesting again while Finance has not acted replaces the requester
    /// and notes.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The caller may not request closure
    /// - The lead does not exist
    /// - The track is already closed
    /// - Some entry on the track is not terminal-approved
    /// - Database operation fails
    pub async fn request_closure(
        &self,
        caller: &Caller,
        lead_id: Uuid,
        track: Track,
        notes: Option<String>,
    ) -> Result<leads::Model, LedgerError> {
        caller.require(Action::RequestClosure)?;

        let txn = self.db.begin().await.map_err(db_err)?;
        let lead = lock_open_lead(&txn, lead_id, track).await?;
        let current = lead.closure_state(track)?;
        let outstanding = outstanding_entries(&txn, lead_id, track).await?;

        let next = match ClosureCoordinator::request(track, &current, outstanding, caller.id, notes)
        {
            Ok(next) => next,
            Err(e) => {
                warn!(lead_id = %lead_id, %track, outstanding, error = %e, "closure request refused");
                return Err(e);
            }
        };

        let columns = TrackColumns::of(track);
        let stored = next.to_columns();
        leads::Entity::update_many()
            .col_expr(columns.closed_by_sales_id, Expr::value(stored.closed_by_sales_id))
            .col_expr(columns.closure_notes, Expr::value(stored.notes))
            .col_expr(leads::Column::UpdatedAt, now_expr())
            .filter(leads::Column::Id.eq(lead_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let lead = find_lead(&txn, lead_id).await?;
        txn.commit().await.map_err(db_err)?;

        info!(lead_id = %lead_id, %track, requested_by = %caller.id, "closure requested");
        self.emit(LedgerEvent::ClosureRequested {
            lead_id,
            track,
            requested_by: caller.id,
        });

        Ok(lead)
    }

    /// Phase 2: Finance closes `track` after Sales requested it.
    ///
    /// The guard is checked again, and the lead's ledger status is derived
    /// in the same UPDATE that stamps `closed_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The caller may not authorize closure
    /// - The lead does not exist
    /// - Sales has not requested closure (`OutOfOrder`)
    /// - The track is already closed
    /// - Some entry on the track is not terminal-approved
    /// - Database operation fails
    pub async fn authorize_closure(
        &self,
        caller: &Caller,
        lead_id: Uuid,
        track: Track,
    ) -> Result<leads::Model, LedgerError> {
        caller.require(Action::AuthorizeClosure)?;

        let txn = self.db.begin().await.map_err(db_err)?;
        let lead = lock_open_lead(&txn, lead_id, track).await?;
        let current = lead.closure_state(track)?;
        let outstanding = outstanding_entries(&txn, lead_id, track).await?;

        let next = match ClosureCoordinator::authorize(track, &current, outstanding, caller.id) {
            Ok(next) => next,
            Err(e) => {
                warn!(lead_id = %lead_id, %track, outstanding, error = %e, "closure authorization refused");
                return Err(e);
            }
        };
        let ClosureState::Closed { closed_at, .. } = next else {
            return Err(LedgerError::InconsistentClosure(track));
        };

        let columns = TrackColumns::of(track);
        let other = TrackColumns::of(track.other());
        let closed_at: DateTimeWithTimeZone = closed_at.into();

        let result = leads::Entity::update_many()
            .col_expr(columns.closed_by_finance_id, Expr::value(Some(caller.id)))
            .col_expr(columns.closed_at, Expr::value(Some(closed_at)))
            .col_expr(leads::Column::LedgerStatus, derived_ledger_status(other))
            .col_expr(leads::Column::UpdatedAt, now_expr())
            .filter(leads::Column::Id.eq(lead_id))
            .filter(columns.closed_by_sales_id.is_not_null())
            .filter(columns.closed_at.is_null())
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(LedgerError::ConcurrentModification);
        }

        let lead = find_lead(&txn, lead_id).await?;
        txn.commit().await.map_err(db_err)?;

        let ledger_closed = ClosureCoordinator::ledger_status(
            &lead.closure_state(Track::Payment)?,
            &lead.closure_state(Track::Document)?,
        )
        .is_closed();

        info!(
            lead_id = %lead_id,
            %track,
            authorized_by = %caller.id,
            ledger_closed,
            "closure authorized"
        );
        self.emit(LedgerEvent::ClosureAuthorized {
            lead_id,
            track,
            authorized_by: caller.id,
            ledger_closed,
        });

        Ok(lead)
    }
}

/// `CASE WHEN <other track>.closed_at IS NOT NULL THEN 'CLOSED' ELSE 'ACTIVE' END`
fn derived_ledger_status(other: TrackColumns) -> SimpleExpr {
    Expr::case(
        Condition::all().add(other.closed_at.is_not_null()),
        Expr::value(LedgerStatus::Closed),
    )
    .finally(Expr::value(LedgerStatus::Active))
    .into()
}

/// Entries on `track` that are not terminal-approved.
async fn outstanding_entries(
    txn: &DatabaseTransaction,
    lead_id: Uuid,
    track: Track,
) -> Result<u64, LedgerError> {
    let count = match track {
        Track::Payment => {
            payment_entries::Entity::find()
                .filter(payment_entries::Column::LeadId.eq(lead_id))
                .filter(payment_entries::Column::Status.ne(EntryStatus::Approved))
                .count(txn)
                .await
        }
        Track::Document => {
            document_entries::Entity::find()
                .filter(document_entries::Column::LeadId.eq(lead_id))
                .filter(
                    Condition::any()
                        .add(document_entries::Column::SalesApproved.eq(false))
                        .add(document_entries::Column::FinanceApproved.eq(false)),
                )
                .count(txn)
                .await
        }
    };
    count.map_err(db_err)
}
