//! Ledger reconciliation for converted sales leads.
//!
//! A lead's ledger has two tracks: payments, whose approved amounts feed
//! the lead's credited-total accumulator, and documents, which need
//! independent Sales and Finance approval. Each track closes through a
//! two-phase protocol (Sales requests, Finance authorizes).
//!
//! # Modules
//!
//! - `types` - Entry status, decisions, tracks, review sides
//! - `error` - Ledger error taxonomy
//! - `access` - Role set and the authorization gate
//! - `payment` - Payment verification and accumulator deltas
//! - `document` - Dual-approval review rules
//! - `closure` - Two-phase closure state machine
//! - `notify` - Notification events and the notifier seam

pub mod access;
pub mod closure;
pub mod document;
pub mod error;
pub mod notify;
pub mod payment;
pub mod types;

#[cfg(test)]
mod closure_props;
#[cfg(test)]
mod document_props;
#[cfg(test)]
mod payment_props;

pub use access::{Action, AuthorizationGate, Caller, Role, RoleSet};
pub use closure::{ClosureColumns, ClosureCoordinator, ClosurePhase, ClosureState};
pub use document::{DocumentApproval, DocumentReconciler, SideApproval};
pub use error::LedgerError;
pub use notify::{LedgerEvent, LedgerNotifier, NoopNotifier};
pub use payment::{PaymentReconciler, PaymentVerification};
pub use types::{Attachment, Decision, EntryStatus, LedgerStatus, ReviewSide, Track};
