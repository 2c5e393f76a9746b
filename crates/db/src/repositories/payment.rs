//! Payment entry operations.
//!
//! Verification is the only path that moves the lead's accumulator. The
//! entry update is a compare-and-swap on `version`, and the accumulator
//! moves by a single `total + delta` statement in the same transaction, so
//! concurrent verifications neither double-apply nor lose updates.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, Set,
    TransactionTrait, UpdateMany,
    prelude::DateTimeWithTimeZone,
    sea_query::Expr,
};
use tracing::info;
use uuid::Uuid;

use dealflow_core::reconcile::{
    Action, Attachment, Caller, Decision, LedgerError, LedgerEvent, PaymentReconciler,
    PaymentVerification, Track,
};

use crate::entities::{leads, payment_entries, sea_orm_active_enums::EntryStatus};

use super::cas::{Attempt, retry_on_conflict};
use super::ledger::{LedgerRepository, db_err, ensure_track_open, lock_open_lead, now_expr};

/// Input for submitting a payment entry.
#[derive(Debug, Clone)]
pub struct NewPaymentEntry {
    /// Amount received, strictly positive.
    pub amount: Decimal,
    /// Free-form note.
    pub note: String,
    /// Optional receipt in the attachment store.
    pub attachment: Option<Attachment>,
}

/// Finance's verdict on a payment entry.
#[derive(Debug, Clone)]
pub struct VerifyPayment {
    /// Approve or reject.
    pub decision: Decision,
    /// Notes, mandatory for rejection.
    pub finance_notes: Option<String>,
}

impl LedgerRepository {
    /// Records a new PENDING payment entry. The accumulator is untouched
    /// until the entry is approved.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The caller may not submit payments
    /// - The amount is not positive
    /// - The lead does not exist
    /// - The payment track is closed
    /// - Database operation fails
    pub async fn submit_payment_entry(
        &self,
        caller: &Caller,
        lead_id: Uuid,
        input: NewPaymentEntry,
    ) -> Result<payment_entries::Model, LedgerError> {
        caller.require(Action::SubmitPayment)?;
        PaymentReconciler::validate_submission(input.amount)?;

        let txn = self.db.begin().await.map_err(db_err)?;

        lock_open_lead(&txn, lead_id, Track::Payment).await?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let (attachment_url, attachment_type) = input
            .attachment
            .map_or((None, None), |a| (Some(a.url), Some(a.media_type)));

        let entry = payment_entries::ActiveModel {
            id: Set(Uuid::now_v7()),
            lead_id: Set(lead_id),
            amount: Set(input.amount),
            note: Set(input.note.trim().to_string()),
            attachment_url: Set(attachment_url),
            attachment_type: Set(attachment_type),
            status: Set(EntryStatus::Pending),
            uploader_id: Set(caller.id),
            verified_by_id: Set(None),
            verified_at: Set(None),
            finance_notes: Set(None),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        info!(
            lead_id = %lead_id,
            entry_id = %entry.id,
            amount = %entry.amount,
            "payment entry submitted"
        );
        Ok(entry)
    }

    /// Approves or rejects a payment entry and moves the accumulator by the
    /// delta implied by the entry's previous persisted status.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The caller may not verify payments
    /// - The entry does not exist
    /// - A rejection carries no notes
    /// - The payment track is closed
    /// - The entry kept changing underneath (`ConcurrentModification`)
    /// - Database operation fails
    pub async fn verify_payment_entry(
        &self,
        caller: &Caller,
        entry_id: Uuid,
        input: VerifyPayment,
    ) -> Result<payment_entries::Model, LedgerError> {
        caller.require(Action::VerifyPayment)?;

        let input = &input;
        let (entry, verification) =
            retry_on_conflict(entry_id, || self.try_verify(caller, entry_id, input)).await?;

        info!(
            lead_id = %entry.lead_id,
            entry_id = %entry.id,
            from = %verification.previous_status,
            to = %verification.new_status,
            delta = %verification.accumulator_delta,
            "payment entry verified"
        );
        if verification.is_rejection() {
            self.emit(LedgerEvent::PaymentRejected {
                lead_id: entry.lead_id,
                entry_id: entry.id,
                amount: entry.amount,
                notes: verification.finance_notes.clone().unwrap_or_default(),
            });
        }
        Ok(entry)
    }

    async fn try_verify(
        &self,
        caller: &Caller,
        entry_id: Uuid,
        input: &VerifyPayment,
    ) -> Result<Attempt<(payment_entries::Model, PaymentVerification)>, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let entry = payment_entries::Entity::find_by_id(entry_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::PaymentEntryNotFound(entry_id))?;

        ensure_track_open(&txn, entry.lead_id, Track::Payment).await?;

        let verification = match Self::apply_verification(&txn, caller, &entry, input).await? {
            Attempt::Done(verification) => verification,
            Attempt::Conflict => {
                txn.rollback().await.map_err(db_err)?;
                return Ok(Attempt::Conflict);
            }
        };

        let updated = payment_entries::Entity::find_by_id(entry_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::PaymentEntryNotFound(entry_id))?;

        txn.commit().await.map_err(db_err)?;

        Ok(Attempt::Done((updated, verification)))
    }

    /// Writes the verification of `observed` as a compare-and-swap on its
    /// version, then moves the accumulator. `Conflict` means the entry no
    /// longer matches `observed` and nothing was written.
    async fn apply_verification(
        txn: &DatabaseTransaction,
        caller: &Caller,
        observed: &payment_entries::Model,
        input: &VerifyPayment,
    ) -> Result<Attempt<PaymentVerification>, LedgerError> {
        let verification = PaymentReconciler::verify(
            observed.status.into(),
            observed.amount,
            input.decision,
            input.finance_notes.clone(),
            caller.id,
        )?;

        let verified_at: DateTimeWithTimeZone = verification.verified_at.into();
        let swapped = payment_entries::Entity::update_many()
            .col_expr(
                payment_entries::Column::Status,
                Expr::value(EntryStatus::from(verification.new_status)),
            )
            .col_expr(
                payment_entries::Column::FinanceNotes,
                Expr::value(verification.finance_notes.clone()),
            )
            .col_expr(
                payment_entries::Column::VerifiedById,
                Expr::value(Some(caller.id)),
            )
            .col_expr(
                payment_entries::Column::VerifiedAt,
                Expr::value(Some(verified_at)),
            )
            .col_expr(
                payment_entries::Column::Version,
                Expr::col(payment_entries::Column::Version).add(1),
            )
            .col_expr(payment_entries::Column::UpdatedAt, now_expr())
            .filter(payment_entries::Column::Id.eq(observed.id))
            .filter(payment_entries::Column::Version.eq(observed.version))
            .exec(txn)
            .await
            .map_err(db_err)?;

        if swapped.rows_affected == 0 {
            return Ok(Attempt::Conflict);
        }

        // Always touch the lead, even for a zero delta: the closed-at filter
        // makes a concurrent phase-2 closure and this verification exclude
        // each other.
        let credited = credit_accumulator(observed.lead_id, verification.accumulator_delta)
            .exec(txn)
            .await
            .map_err(db_err)?;

        if credited.rows_affected == 0 {
            return Err(LedgerError::TrackClosed(Track::Payment));
        }

        Ok(Attempt::Done(verification))
    }
}

/// `total_amount_to_credit = total_amount_to_credit + delta`, evaluated by
/// the store. Matches nothing once the payment track is closed.
fn credit_accumulator(lead_id: Uuid, delta: Decimal) -> UpdateMany<leads::Entity> {
    leads::Entity::update_many()
        .col_expr(
            leads::Column::TotalAmountToCredit,
            Expr::col(leads::Column::TotalAmountToCredit).add(delta),
        )
        .col_expr(leads::Column::UpdatedAt, now_expr())
        .filter(leads::Column::Id.eq(lead_id))
        .filter(leads::Column::PaymentLedgerClosedAt.is_null())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use sea_orm::{DbBackend, QueryTrait};

    use dealflow_core::reconcile::Role;

    use super::*;
    use crate::repositories::test_support::{caller, memory_repo, new_ledger};

    fn approve() -> VerifyPayment {
        VerifyPayment {
            decision: Decision::Approved,
            finance_notes: None,
        }
    }

    #[tokio::test]
    async fn test_stale_read_writes_nothing() {
        let repo = memory_repo().await;
        let sales = caller(Role::Sales);
        let finance = caller(Role::Finance);
        let lead = repo
            .open_ledger(&sales, new_ledger("Cold room"))
            .await
            .unwrap();
        let observed = repo
            .submit_payment_entry(
                &sales,
                lead.id,
                NewPaymentEntry {
                    amount: dec!(500),
                    note: "deposit".into(),
                    attachment: None,
                },
            )
            .await
            .unwrap();
        repo.verify_payment_entry(&finance, observed.id, approve())
            .await
            .unwrap();

        // Second reviewer still holding the PENDING read at version 0.
        let txn = repo.db.begin().await.unwrap();
        let outcome = LedgerRepository::apply_verification(&txn, &finance, &observed, &approve())
            .await
            .unwrap();
        assert!(matches!(outcome, Attempt::Conflict));
        txn.rollback().await.unwrap();

        let entry = payment_entries::Entity::find_by_id(observed.id)
            .one(&repo.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.version, 1);
        assert_eq!(entry.status, EntryStatus::Approved);

        let lead = leads::Entity::find_by_id(lead.id)
            .one(&repo.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lead.total_amount_to_credit, dec!(500));
    }

    #[tokio::test]
    async fn test_current_read_swaps_and_credits() {
        let repo = memory_repo().await;
        let sales = caller(Role::Sales);
        let finance = caller(Role::Finance);
        let lead = repo
            .open_ledger(&sales, new_ledger("Loading dock"))
            .await
            .unwrap();
        let observed = repo
            .submit_payment_entry(
                &sales,
                lead.id,
                NewPaymentEntry {
                    amount: dec!(320),
                    note: "first instalment".into(),
                    attachment: None,
                },
            )
            .await
            .unwrap();

        let txn = repo.db.begin().await.unwrap();
        let outcome = LedgerRepository::apply_verification(&txn, &finance, &observed, &approve())
            .await
            .unwrap();
        txn.commit().await.unwrap();

        let Attempt::Done(verification) = outcome else {
            panic!("expected the swap to land");
        };
        assert_eq!(verification.accumulator_delta, dec!(320));

        let lead = leads::Entity::find_by_id(lead.id)
            .one(&repo.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lead.total_amount_to_credit, dec!(320));
    }

    #[test]
    fn test_accumulator_moves_by_store_side_addition() {
        let sql = credit_accumulator(Uuid::nil(), dec!(250))
            .build(DbBackend::Postgres)
            .to_string();

        assert!(
            sql.contains(r#""total_amount_to_credit" = "total_amount_to_credit" + "#),
            "{sql}"
        );
        assert!(sql.contains(r#""payment_ledger_closed_at" IS NULL"#), "{sql}");
    }
}
