//! Ledger notification events.
//!
//! The engine signals these after a mutation commits. Delivery is the
//! notifier's concern: `notify` must return immediately and never fail
//! the operation that raised the event.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::reconcile::types::{ReviewSide, Track};

/// Something that happened on a lead's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A ledger was opened for a converted lead.
    LedgerOpened {
        /// The lead.
        lead_id: Uuid,
        /// Lead title.
        title: String,
        /// Who opened it.
        opened_by: Uuid,
    },
    /// Sales requested closure of a track.
    ClosureRequested {
        /// The lead.
        lead_id: Uuid,
        /// The track.
        track: Track,
        /// The Sales requester.
        requested_by: Uuid,
    },
    /// Finance authorized closure of a track.
    ClosureAuthorized {
        /// The lead.
        lead_id: Uuid,
        /// The track.
        track: Track,
        /// The Finance authorizer.
        authorized_by: Uuid,
        /// Whether the whole ledger is now closed.
        ledger_closed: bool,
    },
    /// Finance rejected a payment entry.
    PaymentRejected {
        /// The lead.
        lead_id: Uuid,
        /// The rejected entry.
        entry_id: Uuid,
        /// The entry amount.
        amount: Decimal,
        /// Rejection notes.
        notes: String,
    },
    /// One side rejected a document entry.
    DocumentRejected {
        /// The lead.
        lead_id: Uuid,
        /// The rejected entry.
        entry_id: Uuid,
        /// The rejecting side.
        side: ReviewSide,
        /// Rejection notes.
        notes: String,
    },
}

impl LedgerEvent {
    /// The lead the event concerns.
    #[must_use]
    pub fn lead_id(&self) -> Uuid {
        match self {
            Self::LedgerOpened { lead_id, .. }
            | Self::ClosureRequested { lead_id, .. }
            | Self::ClosureAuthorized { lead_id, .. }
            | Self::PaymentRejected { lead_id, .. }
            | Self::DocumentRejected { lead_id, .. } => *lead_id,
        }
    }
}

/// Fire-and-forget sink for ledger events.
pub trait LedgerNotifier: Send + Sync {
    /// Signal an event. Must not block.
    fn notify(&self, event: LedgerEvent);
}

/// Notifier that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl LedgerNotifier for NoopNotifier {
    fn notify(&self, _event: LedgerEvent) {}
}
