//! Payment entry rules and the credited-amount accumulator.
//!
//! The accumulator on a lead must always equal the sum of amounts of its
//! APPROVED payment entries. It is never recomputed in normal operation;
//! every verification yields a delta derived from the entry's *previous*
//! persisted status, and the store applies that delta atomically.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::reconcile::error::LedgerError;
use crate::reconcile::types::{Decision, EntryStatus, normalize_notes};

/// Outcome of verifying a payment entry, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentVerification {
    /// Status observed before the verification.
    pub previous_status: EntryStatus,
    /// Status after the verification.
    pub new_status: EntryStatus,
    /// Signed change to apply to the lead's accumulator (zero, +amount or -amount).
    pub accumulator_delta: Decimal,
    /// Finance notes (trimmed), mandatory for rejection.
    pub finance_notes: Option<String>,
    /// Who verified the entry.
    pub verified_by: Uuid,
    /// When the entry was verified.
    pub verified_at: DateTime<Utc>,
}

impl PaymentVerification {
    /// Returns true if this verification rejects an entry.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        self.new_status == EntryStatus::Rejected
    }
}

/// Stateless rules for payment entries.
pub struct PaymentReconciler;

impl PaymentReconciler {
    /// Validate a new payment submission.
    ///
    /// # Returns
    /// * `Ok(())` if the amount is strictly positive
    /// * `Err(LedgerError::InvalidAmount)` otherwise
    pub fn validate_submission(amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        Ok(())
    }

    /// Accumulator change caused by moving an entry of `amount` from
    /// `previous` to the status implied by `decision`.
    ///
    /// - not APPROVED → APPROVED: `+amount`
    /// - APPROVED → REJECTED: `-amount`
    /// - anything else: zero
    #[must_use]
    pub fn accumulator_delta(previous: EntryStatus, decision: Decision, amount: Decimal) -> Decimal {
        match (previous, decision) {
            (EntryStatus::Pending | EntryStatus::Rejected, Decision::Approved) => amount,
            (EntryStatus::Approved, Decision::Rejected) => -amount,
            _ => Decimal::ZERO,
        }
    }

    /// Verify a payment entry.
    ///
    /// # Arguments
    /// * `previous_status` - Status read from the store immediately before mutating
    /// * `amount` - The entry's stored amount
    /// * `decision` - Finance's verdict
    /// * `finance_notes` - Notes, mandatory and non-blank for rejection
    /// * `verified_by` - The verifying user
    ///
    /// # Returns
    /// * `Ok(PaymentVerification)` describing the new state and accumulator delta
    /// * `Err(LedgerError::RejectionNotesRequired)` if rejecting without notes
    pub fn verify(
        previous_status: EntryStatus,
        amount: Decimal,
        decision: Decision,
        finance_notes: Option<String>,
        verified_by: Uuid,
    ) -> Result<PaymentVerification, LedgerError> {
        let finance_notes = normalize_notes(finance_notes);
        if decision == Decision::Rejected && finance_notes.is_none() {
            return Err(LedgerError::RejectionNotesRequired);
        }

        Ok(PaymentVerification {
            previous_status,
            new_status: decision.as_status(),
            accumulator_delta: Self::accumulator_delta(previous_status, decision, amount),
            finance_notes,
            verified_by,
            verified_at: Utc::now(),
        })
    }

    /// Sum of approved amounts by full scan. Used only to audit the
    /// incrementally maintained accumulator.
    pub fn approved_total<I>(entries: I) -> Decimal
    where
        I: IntoIterator<Item = (EntryStatus, Decimal)>,
    {
        entries
            .into_iter()
            .filter(|(status, _)| *status == EntryStatus::Approved)
            .map(|(_, amount)| amount)
            .sum()
    }
}
