//! Two-phase track closure.
//!
//! Each track (payment, document) closes independently: Sales requests
//! closure once every entry on the track is terminal-approved, then Finance
//! authorizes it. The lead's ledger status is CLOSED exactly when both
//! tracks are closed.
//!
//! Valid transitions:
//! - Open → PendingFinance (request)
//! - PendingFinance → PendingFinance (re-request)
//! - PendingFinance → Closed (authorize)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::reconcile::error::LedgerError;
use crate::reconcile::types::{LedgerStatus, Track, normalize_notes};

/// Closure state of one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosureState {
    /// Entries may still be submitted and reviewed.
    Open,
    /// Sales requested closure; waiting for Finance.
    PendingFinance {
        /// The Sales user who requested closure.
        requested_by: Uuid,
        /// Closure notes from the request.
        notes: Option<String>,
    },
    /// Both phases complete.
    Closed {
        /// The Sales user who requested closure.
        requested_by: Uuid,
        /// The Finance user who authorized closure.
        authorized_by: Uuid,
        /// When closure was authorized.
        closed_at: DateTime<Utc>,
        /// Closure notes from the request.
        notes: Option<String>,
    },
}

/// The persisted columns a track's closure state is stored in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureColumns {
    /// `<track>_ledger_closed_by_sales_id`
    pub closed_by_sales_id: Option<Uuid>,
    /// `<track>_ledger_closed_by_finance_id`
    pub closed_by_finance_id: Option<Uuid>,
    /// `<track>_ledger_closed_at`
    pub closed_at: Option<DateTime<Utc>>,
    /// `<track>_ledger_closure_notes`
    pub notes: Option<String>,
}

/// Label of a closure state, for API responses and filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosurePhase {
    /// See [`ClosureState::Open`].
    Open,
    /// See [`ClosureState::PendingFinance`].
    PendingFinance,
    /// See [`ClosureState::Closed`].
    Closed,
}

impl ClosurePhase {
    /// Returns the string representation of the phase.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::PendingFinance => "pending_finance",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ClosurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ClosureState {
    /// Rebuilds a state from its persisted columns.
    ///
    /// # Errors
    /// `LedgerError::InconsistentClosure` if the columns form a combination
    /// no valid transition sequence produces (e.g. `closed_at` without a
    /// Sales requester).
    pub fn from_columns(track: Track, columns: ClosureColumns) -> Result<Self, LedgerError> {
        match (
            columns.closed_by_sales_id,
            columns.closed_by_finance_id,
            columns.closed_at,
        ) {
            (None, None, None) => Ok(Self::Open),
            (Some(requested_by), None, None) => Ok(Self::PendingFinance {
                requested_by,
                notes: columns.notes,
            }),
            (Some(requested_by), Some(authorized_by), Some(closed_at)) => Ok(Self::Closed {
                requested_by,
                authorized_by,
                closed_at,
                notes: columns.notes,
            }),
            _ => Err(LedgerError::InconsistentClosure(track)),
        }
    }

    /// Flattens the state into its persisted columns.
    #[must_use]
    pub fn to_columns(&self) -> ClosureColumns {
        match self {
            Self::Open => ClosureColumns::default(),
            Self::PendingFinance {
                requested_by,
                notes,
            } => ClosureColumns {
                closed_by_sales_id: Some(*requested_by),
                closed_by_finance_id: None,
                closed_at: None,
                notes: notes.clone(),
            },
            Self::Closed {
                requested_by,
                authorized_by,
                closed_at,
                notes,
            } => ClosureColumns {
                closed_by_sales_id: Some(*requested_by),
                closed_by_finance_id: Some(*authorized_by),
                closed_at: Some(*closed_at),
                notes: notes.clone(),
            },
        }
    }

    /// Returns the phase label.
    #[must_use]
    pub fn phase(&self) -> ClosurePhase {
        match self {
            Self::Open => ClosurePhase::Open,
            Self::PendingFinance { .. } => ClosurePhase::PendingFinance,
            Self::Closed { .. } => ClosurePhase::Closed,
        }
    }

    /// Returns true once both phases are complete.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}

/// Stateless rules for the two-phase closure protocol.
pub struct ClosureCoordinator;

impl ClosureCoordinator {
    /// Fails with `TrackClosed` if the track no longer accepts mutations.
    pub fn ensure_open(track: Track, state: &ClosureState) -> Result<(), LedgerError> {
        if state.is_closed() {
            return Err(LedgerError::TrackClosed(track));
        }
        Ok(())
    }

    /// The closure guard: every entry on the track must be terminal-approved.
    ///
    /// `outstanding` is the number of entries that are not.
    pub fn check_guard(track: Track, outstanding: u64) -> Result<(), LedgerError> {
        if outstanding > 0 {
            return Err(LedgerError::IncompleteApprovals { track, outstanding });
        }
        Ok(())
    }

    /// Phase 1: Sales requests closure.
    ///
    /// # Returns
    /// * `Ok(ClosureState::PendingFinance)` on success
    /// * `Err(LedgerError::TrackClosed)` if the track is already closed
    /// * `Err(LedgerError::IncompleteApprovals)` if the guard fails
    pub fn request(
        track: Track,
        current: &ClosureState,
        outstanding: u64,
        requested_by: Uuid,
        notes: Option<String>,
    ) -> Result<ClosureState, LedgerError> {
        Self::ensure_open(track, current)?;
        Self::check_guard(track, outstanding)?;

        Ok(ClosureState::PendingFinance {
            requested_by,
            notes: normalize_notes(notes),
        })
    }

    /// Phase 2: Finance authorizes closure.
    ///
    /// # Returns
    /// * `Ok(ClosureState::Closed)` on success
    /// * `Err(LedgerError::OutOfOrder)` if Sales has not requested closure
    /// * `Err(LedgerError::TrackClosed)` if the track is already closed
    /// * `Err(LedgerError::IncompleteApprovals)` if the re-validated guard fails
    pub fn authorize(
        track: Track,
        current: &ClosureState,
        outstanding: u64,
        authorized_by: Uuid,
    ) -> Result<ClosureState, LedgerError> {
        match current {
            ClosureState::Open => Err(LedgerError::OutOfOrder(track)),
            ClosureState::Closed { .. } => Err(LedgerError::TrackClosed(track)),
            ClosureState::PendingFinance {
                requested_by,
                notes,
            } => {
                Self::check_guard(track, outstanding)?;
                Ok(ClosureState::Closed {
                    requested_by: *requested_by,
                    authorized_by,
                    closed_at: Utc::now(),
                    notes: notes.clone(),
                })
            }
        }
    }

    /// Derives the lead's ledger status from its two tracks.
    #[must_use]
    pub fn ledger_status(payment: &ClosureState, document: &ClosureState) -> LedgerStatus {
        if payment.is_closed() && document.is_closed() {
            LedgerStatus::Closed
        } else {
            LedgerStatus::Active
        }
    }
}
