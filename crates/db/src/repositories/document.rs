//! Document entry operations.
//!
//! A review rewrites both approval sides and the derived status in one
//! compare-and-swap on `version`, so Sales and Finance reviewing the same
//! document at once cannot leave a composite status that neither saw.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, Set,
    TransactionTrait,
    prelude::DateTimeWithTimeZone,
    sea_query::Expr,
};
use tracing::info;
use uuid::Uuid;

use dealflow_core::reconcile::{
    Action, Attachment, Caller, Decision, DocumentApproval, DocumentReconciler, LedgerError,
    LedgerEvent, ReviewSide, Track,
};

use crate::entities::{document_entries, leads, sea_orm_active_enums::EntryStatus};

use super::cas::{Attempt, retry_on_conflict};
use super::ledger::{LedgerRepository, db_err, ensure_track_open, lock_open_lead, now_expr};

/// Input for submitting a document entry.
#[derive(Debug, Clone)]
pub struct NewDocumentEntry {
    /// Free-form note.
    pub note: String,
    /// The uploaded document.
    pub attachment: Attachment,
}

/// One side's review of a document entry.
#[derive(Debug, Clone)]
pub struct ReviewDocument {
    /// Which side the caller acts for.
    pub side: ReviewSide,
    /// Approve or reject.
    pub decision: Decision,
    /// Notes, mandatory for rejection.
    pub notes: Option<String>,
}

impl LedgerRepository {
    /// Records a new document entry with both sides unapproved.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The caller may not submit documents
    /// - The attachment URL is blank
    /// - The lead does not exist
    /// - The document track is closed
    /// - Database operation fails
    pub async fn submit_document_entry(
        &self,
        caller: &Caller,
        lead_id: Uuid,
        input: NewDocumentEntry,
    ) -> Result<document_entries::Model, LedgerError> {
        caller.require(Action::SubmitDocument)?;

        let url = input.attachment.url.trim();
        if url.is_empty() {
            return Err(LedgerError::InvalidInput(
                "attachment url must not be blank".into(),
            ));
        }

        let txn = self.db.begin().await.map_err(db_err)?;
        lock_open_lead(&txn, lead_id, Track::Document).await?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let entry = document_entries::ActiveModel {
            id: Set(Uuid::now_v7()),
            lead_id: Set(lead_id),
            note: Set(input.note.trim().to_string()),
            attachment_url: Set(url.to_string()),
            attachment_type: Set(input.attachment.media_type.trim().to_string()),
            uploader_id: Set(caller.id),
            sales_approved: Set(false),
            sales_reviewed_by: Set(None),
            sales_reviewed_at: Set(None),
            sales_notes: Set(None),
            finance_approved: Set(false),
            finance_reviewed_by: Set(None),
            finance_reviewed_at: Set(None),
            finance_notes: Set(None),
            status: Set(EntryStatus::Pending),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        info!(lead_id = %lead_id, entry_id = %entry.id, "document entry submitted");
        Ok(entry)
    }

    /// Applies one side's review to a document entry.
    ///
    /// A caller holding both roles (or ADMIN) picks the side explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The caller may not review for the requested side
    /// - The entry does not exist
    /// - A rejection carries no notes
    /// - The document track is closed
    /// - The entry kept changing underneath (`ConcurrentModification`)
    /// - Database operation fails
    pub async fn review_document_entry(
        &self,
        caller: &Caller,
        entry_id: Uuid,
        input: ReviewDocument,
    ) -> Result<document_entries::Model, LedgerError> {
        caller.require(Action::ReviewDocument(input.side))?;

        let input = &input;
        let (entry, approval) =
            retry_on_conflict(entry_id, || self.try_review(caller, entry_id, input)).await?;

        info!(
            lead_id = %entry.lead_id,
            entry_id = %entry.id,
            side = %input.side,
            status = %approval.status,
            "document entry reviewed"
        );
        if input.decision == Decision::Rejected {
            self.emit(LedgerEvent::DocumentRejected {
                lead_id: entry.lead_id,
                entry_id: entry.id,
                side: input.side,
                notes: approval.side(input.side).notes.clone().unwrap_or_default(),
            });
        }
        Ok(entry)
    }

    async fn try_review(
        &self,
        caller: &Caller,
        entry_id: Uuid,
        input: &ReviewDocument,
    ) -> Result<Attempt<(document_entries::Model, DocumentApproval)>, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let entry = document_entries::Entity::find_by_id(entry_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::DocumentEntryNotFound(entry_id))?;

        ensure_track_open(&txn, entry.lead_id, Track::Document).await?;

        let next = match Self::apply_review(&txn, caller, &entry, input).await? {
            Attempt::Done(next) => next,
            Attempt::Conflict => {
                txn.rollback().await.map_err(db_err)?;
                return Ok(Attempt::Conflict);
            }
        };

        let updated = document_entries::Entity::find_by_id(entry_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::DocumentEntryNotFound(entry_id))?;

        txn.commit().await.map_err(db_err)?;

        Ok(Attempt::Done((updated, next)))
    }

    /// Writes one side's review of `observed` as a compare-and-swap on its
    /// version. `Conflict` means the entry no longer matches `observed` and
    /// nothing was written.
    async fn apply_review(
        txn: &DatabaseTransaction,
        caller: &Caller,
        observed: &document_entries::Model,
        input: &ReviewDocument,
    ) -> Result<Attempt<DocumentApproval>, LedgerError> {
        let next = DocumentReconciler::review(
            &observed.approval(),
            input.side,
            input.decision,
            input.notes.clone(),
            caller.id,
        )?;

        let swapped = document_entries::Entity::update_many()
            .col_expr(
                document_entries::Column::SalesApproved,
                Expr::value(next.sales.approved),
            )
            .col_expr(
                document_entries::Column::SalesReviewedBy,
                Expr::value(next.sales.reviewed_by),
            )
            .col_expr(
                document_entries::Column::SalesReviewedAt,
                Expr::value(to_db_time(next.sales.reviewed_at)),
            )
            .col_expr(
                document_entries::Column::SalesNotes,
                Expr::value(next.sales.notes.clone()),
            )
            .col_expr(
                document_entries::Column::FinanceApproved,
                Expr::value(next.finance.approved),
            )
            .col_expr(
                document_entries::Column::FinanceReviewedBy,
                Expr::value(next.finance.reviewed_by),
            )
            .col_expr(
                document_entries::Column::FinanceReviewedAt,
                Expr::value(to_db_time(next.finance.reviewed_at)),
            )
            .col_expr(
                document_entries::Column::FinanceNotes,
                Expr::value(next.finance.notes.clone()),
            )
            .col_expr(
                document_entries::Column::Status,
                Expr::value(EntryStatus::from(next.status)),
            )
            .col_expr(
                document_entries::Column::Version,
                Expr::col(document_entries::Column::Version).add(1),
            )
            .col_expr(document_entries::Column::UpdatedAt, now_expr())
            .filter(document_entries::Column::Id.eq(observed.id))
            .filter(document_entries::Column::Version.eq(observed.version))
            .exec(txn)
            .await
            .map_err(db_err)?;

        if swapped.rows_affected == 0 {
            return Ok(Attempt::Conflict);
        }

        // Excludes a concurrent phase-2 closure of the document track.
        let touched = leads::Entity::update_many()
            .col_expr(leads::Column::UpdatedAt, now_expr())
            .filter(leads::Column::Id.eq(observed.lead_id))
            .filter(leads::Column::DocumentLedgerClosedAt.is_null())
            .exec(txn)
            .await
            .map_err(db_err)?;

        if touched.rows_affected == 0 {
            return Err(LedgerError::TrackClosed(Track::Document));
        }

        Ok(Attempt::Done(next))
    }
}

fn to_db_time(at: Option<DateTime<Utc>>) -> Option<DateTimeWithTimeZone> {
    at.map(Into::into)
}
