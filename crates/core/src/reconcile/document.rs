//! Dual-approval rules for document entries.
//!
//! A document carries two independent approval sides (Sales, Finance).
//! Its overall status is APPROVED only when both sides are approved at the
//! same observation point. A rejection from either side marks the whole
//! entry REJECTED but clears only the rejecting side's flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reconcile::error::LedgerError;
use crate::reconcile::types::{Decision, EntryStatus, ReviewSide, normalize_notes};

/// One side's approval record on a document entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideApproval {
    /// Whether this side currently approves the document.
    pub approved: bool,
    /// Who last reviewed for this side.
    pub reviewed_by: Option<Uuid>,
    /// When this side last reviewed.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Notes left by this side's last review.
    pub notes: Option<String>,
}

/// The composite approval state of a document entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentApproval {
    /// Overall status.
    pub status: EntryStatus,
    /// Sales-side approval.
    pub sales: SideApproval,
    /// Finance-side approval.
    pub finance: SideApproval,
}

impl Default for DocumentApproval {
    fn default() -> Self {
        Self::pending()
    }
}

impl DocumentApproval {
    /// State of a freshly submitted document: both flags false, PENDING.
    #[must_use]
    pub fn pending() -> Self {
        Self {
            status: EntryStatus::Pending,
            sales: SideApproval::default(),
            finance: SideApproval::default(),
        }
    }

    /// Returns the approval record for `side`.
    #[must_use]
    pub fn side(&self, side: ReviewSide) -> &SideApproval {
        match side {
            ReviewSide::Sales => &self.sales,
            ReviewSide::Finance => &self.finance,
        }
    }

    fn side_mut(&mut self, side: ReviewSide) -> &mut SideApproval {
        match side {
            ReviewSide::Sales => &mut self.sales,
            ReviewSide::Finance => &mut self.finance,
        }
    }

    /// Terminal-approved: both sides approve. This, not `status`, is what
    /// the document closure guard checks.
    #[must_use]
    pub fn is_fully_approved(&self) -> bool {
        self.sales.approved && self.finance.approved
    }
}

/// Stateless rules for document entries.
pub struct DocumentReconciler;

impl DocumentReconciler {
    /// Apply one side's review to the current approval state.
    ///
    /// # Arguments
    /// * `current` - The approval state read from the store
    /// * `side` - The side the reviewer acts for
    /// * `decision` - Approve or reject
    /// * `notes` - Review notes, mandatory and non-blank for rejection;
    ///   an approval without notes keeps the side's previous notes
    /// * `reviewed_by` - The reviewing user
    ///
    /// # Returns
    /// The new approval state to be written back with compare-and-swap.
    ///
    /// A later approval from the side that rejected flips the entry back to
    /// APPROVED if the other side's flag is still set, even though the
    /// rejection notes remain on record.
    pub fn review(
        current: &DocumentApproval,
        side: ReviewSide,
        decision: Decision,
        notes: Option<String>,
        reviewed_by: Uuid,
    ) -> Result<DocumentApproval, LedgerError> {
        let notes = normalize_notes(notes);
        if decision == Decision::Rejected && notes.is_none() {
            return Err(LedgerError::RejectionNotesRequired);
        }

        let mut next = current.clone();
        {
            let acting = next.side_mut(side);
            acting.approved = decision == Decision::Approved;
            acting.reviewed_by = Some(reviewed_by);
            acting.reviewed_at = Some(Utc::now());
            // An approval without notes leaves the side's earlier notes in place.
            if notes.is_some() {
                acting.notes = notes;
            }
        }

        next.status = match decision {
            Decision::Rejected => EntryStatus::Rejected,
            Decision::Approved if next.is_fully_approved() => EntryStatus::Approved,
            // One side still unapproved: PENDING or a standing REJECTED.
            Decision::Approved => current.status,
        };

        Ok(next)
    }
}
