//! Ledger reconciliation error types.
//!
//! Every rejected precondition has its own variant so callers can render
//! the matching corrective state. None of these are transient.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::reconcile::access::Action;
use crate::reconcile::types::Track;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Payment amount must be strictly positive.
    #[error("Payment amount must be greater than zero, got {0}")]
    InvalidAmount(Decimal),

    /// A rejection was submitted without notes.
    #[error("Notes are required when rejecting an entry")]
    RejectionNotesRequired,

    /// Other malformed input (unknown track, decision, etc.).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Lead (ledger) not found.
    #[error("Lead {0} not found")]
    LeadNotFound(Uuid),

    /// Payment entry not found.
    #[error("Payment entry {0} not found")]
    PaymentEntryNotFound(Uuid),

    /// Document entry not found.
    #[error("Document entry {0} not found")]
    DocumentEntryNotFound(Uuid),

    /// Caller's roles do not permit the action.
    #[error("Caller is not permitted to {action}")]
    Forbidden {
        /// The denied action.
        action: Action,
    },

    /// Mutation attempted on a closed track.
    #[error("The {0} ledger is closed")]
    TrackClosed(Track),

    /// Closure attempted while some entries are not terminal-approved.
    #[error("Cannot close the {track} ledger: {outstanding} entries are not fully approved")]
    IncompleteApprovals {
        /// The track being closed.
        track: Track,
        /// Number of entries blocking closure.
        outstanding: u64,
    },

    /// Finance attempted to authorize closure before Sales requested it.
    #[error("Closure of the {0} ledger has not been requested by sales")]
    OutOfOrder(Track),

    /// A ledger already exists for the lead.
    #[error("A ledger already exists for lead {0}")]
    LedgerAlreadyOpen(Uuid),

    /// Persisted closure columns form an illegal combination.
    #[error("Stored closure state of the {0} ledger is inconsistent")]
    InconsistentClosure(Track),

    /// Compare-and-swap retries were exhausted.
    #[error("Entry was modified concurrently, please retry")]
    ConcurrentModification,

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount(_) | Self::RejectionNotesRequired | Self::InvalidInput(_) => 400,

            Self::Forbidden { .. } => 403,

            Self::LeadNotFound(_)
            | Self::PaymentEntryNotFound(_)
            | Self::DocumentEntryNotFound(_) => 404,

            Self::LedgerAlreadyOpen(_) | Self::ConcurrentModification => 409,

            Self::TrackClosed(_) | Self::IncompleteApprovals { .. } | Self::OutOfOrder(_) => 422,

            Self::InconsistentClosure(_) | Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::RejectionNotesRequired => "REJECTION_NOTES_REQUIRED",
            Self::InvalidInput(_) => "VALIDATION_ERROR",
            Self::LeadNotFound(_) => "LEAD_NOT_FOUND",
            Self::PaymentEntryNotFound(_) => "PAYMENT_ENTRY_NOT_FOUND",
            Self::DocumentEntryNotFound(_) => "DOCUMENT_ENTRY_NOT_FOUND",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::TrackClosed(_) => "TRACK_CLOSED",
            Self::IncompleteApprovals { .. } => "INCOMPLETE_APPROVALS",
            Self::OutOfOrder(_) => "OUT_OF_ORDER",
            Self::LedgerAlreadyOpen(_) => "LEDGER_ALREADY_OPEN",
            Self::InconsistentClosure(_) => "INCONSISTENT_CLOSURE_STATE",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}
