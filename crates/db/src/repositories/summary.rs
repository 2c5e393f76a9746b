//! Derived ledger summary returned alongside a lead's entries.

use rust_decimal::Decimal;
use serde::Serialize;

use dealflow_core::reconcile::{ClosurePhase, LedgerError, Track};

use crate::entities::{
    document_entries, leads, payment_entries, sea_orm_active_enums::EntryStatus,
};

/// Entry counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// PENDING entries.
    pub pending: u64,
    /// APPROVED entries.
    pub approved: u64,
    /// REJECTED entries.
    pub rejected: u64,
}

impl StatusCounts {
    fn tally(statuses: impl IntoIterator<Item = EntryStatus>) -> Self {
        statuses.into_iter().fold(Self::default(), |mut counts, status| {
            match status {
                EntryStatus::Pending => counts.pending += 1,
                EntryStatus::Approved => counts.approved += 1,
                EntryStatus::Rejected => counts.rejected += 1,
            }
            counts
        })
    }

    /// Total entries counted.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.pending + self.approved + self.rejected
    }
}

/// What a ledger screen needs besides the raw rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    /// Payment entries by status.
    pub payments: StatusCounts,
    /// Document entries by overall status.
    pub documents: StatusCounts,
    /// Documents approved by both sides.
    pub documents_fully_approved: u64,
    /// Sum of PENDING payment amounts.
    pub pending_amount: Decimal,
    /// Payment track closure phase.
    pub payment_closure: ClosurePhase,
    /// Document track closure phase.
    pub document_closure: ClosurePhase,
}

impl LedgerSummary {
    /// Builds the summary from already loaded rows.
    ///
    /// # Errors
    ///
    /// `InconsistentClosure` if a track's stored closure columns are illegal.
    pub fn compute(
        lead: &leads::Model,
        payments: &[payment_entries::Model],
        documents: &[document_entries::Model],
    ) -> Result<Self, LedgerError> {
        let pending_amount = payments
            .iter()
            .filter(|p| p.status == EntryStatus::Pending)
            .map(|p| p.amount)
            .sum();

        Ok(Self {
            payments: StatusCounts::tally(payments.iter().map(|p| p.status)),
            documents: StatusCounts::tally(documents.iter().map(|d| d.status)),
            documents_fully_approved: documents
                .iter()
                .filter(|d| d.approval().is_fully_approved())
                .count() as u64,
            pending_amount,
            payment_closure: lead.closure_state(Track::Payment)?.phase(),
            document_closure: lead.closure_state(Track::Document)?.phase(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use crate::entities::sea_orm_active_enums::LedgerStatus;

    fn lead() -> leads::Model {
        let now = Utc::now().into();
        leads::Model {
            id: Uuid::new_v4(),
            title: "Warehouse fit-out".into(),
            customer_name: None,
            total_amount_to_credit: Decimal::ZERO,
            payment_timeline: None,
            payment_ledger_closed_by_sales_id: None,
            payment_ledger_closed_by_finance_id: None,
            payment_ledger_closed_at: None,
            payment_ledger_closure_notes: None,
            document_ledger_closed_by_sales_id: None,
            document_ledger_closed_by_finance_id: None,
            document_ledger_closed_at: None,
            document_ledger_closure_notes: None,
            ledger_status: LedgerStatus::Active,
            opened_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn payment(lead_id: Uuid, amount: Decimal, status: EntryStatus) -> payment_entries::Model {
        let now = Utc::now().into();
        payment_entries::Model {
            id: Uuid::new_v4(),
            lead_id,
            amount,
            note: String::new(),
            attachment_url: None,
            attachment_type: None,
            status,
            uploader_id: Uuid::new_v4(),
            verified_by_id: None,
            verified_at: None,
            finance_notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn document(lead_id: Uuid, sales: bool, finance: bool, status: EntryStatus) -> document_entries::Model {
        let now = Utc::now().into();
        document_entries::Model {
            id: Uuid::new_v4(),
            lead_id,
            note: String::new(),
            attachment_url: "https://files.example.com/po.pdf".into(),
            attachment_type: "application/pdf".into(),
            uploader_id: Uuid::new_v4(),
            sales_approved: sales,
            sales_reviewed_by: None,
            sales_reviewed_at: None,
            sales_notes: None,
            finance_approved: finance,
            finance_reviewed_by: None,
            finance_reviewed_at: None,
            finance_notes: None,
            status,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_counts_and_pending_amount() {
        let lead = lead();
        let payments = vec![
            payment(lead.id, dec!(100), EntryStatus::Pending),
            payment(lead.id, dec!(250.50), EntryStatus::Pending),
            payment(lead.id, dec!(40), EntryStatus::Approved),
            payment(lead.id, dec!(10), EntryStatus::Rejected),
        ];
        let documents = vec![
            document(lead.id, true, true, EntryStatus::Approved),
            document(lead.id, true, false, EntryStatus::Pending),
            // Rejected by sales after finance approved.
            document(lead.id, false, true, EntryStatus::Rejected),
        ];

        let summary = LedgerSummary::compute(&lead, &payments, &documents).unwrap();

        assert_eq!(
            summary.payments,
            StatusCounts { pending: 2, approved: 1, rejected: 1 }
        );
        assert_eq!(summary.payments.total(), 4);
        assert_eq!(summary.pending_amount, dec!(350.50));
        assert_eq!(summary.documents.approved, 1);
        assert_eq!(summary.documents.rejected, 1);
        assert_eq!(summary.documents_fully_approved, 1);
        assert_eq!(summary.payment_closure, ClosurePhase::Open);
        assert_eq!(summary.document_closure, ClosurePhase::Open);
    }

    #[test]
    fn test_closure_phases() {
        let mut lead = lead();
        lead.payment_ledger_closed_by_sales_id = Some(Uuid::new_v4());
        lead.document_ledger_closed_by_sales_id = Some(Uuid::new_v4());
        lead.document_ledger_closed_by_finance_id = Some(Uuid::new_v4());
        lead.document_ledger_closed_at = Some(Utc::now().into());

        let summary = LedgerSummary::compute(&lead, &[], &[]).unwrap();
        assert_eq!(summary.payment_closure, ClosurePhase::PendingFinance);
        assert_eq!(summary.document_closure, ClosurePhase::Closed);
        assert_eq!(summary.pending_amount, Decimal::ZERO);
    }

    #[test]
    fn test_inconsistent_columns_are_reported() {
        let mut lead = lead();
        lead.payment_ledger_closed_at = Some(Utc::now().into());

        let err = LedgerSummary::compute(&lead, &[], &[]).unwrap_err();
        assert!(matches!(err, LedgerError::InconsistentClosure(Track::Payment)));
    }
}
