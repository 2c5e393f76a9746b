//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

mod cas;
mod closure;
mod document;
pub mod ledger;
mod payment;
pub mod summary;
#[cfg(test)]
mod test_support;

pub use document::{NewDocumentEntry, ReviewDocument};
pub use ledger::{AccumulatorAudit, LedgerRepository, LedgerView, MAX_CAS_ATTEMPTS, NewLedger};
pub use payment::{NewPaymentEntry, VerifyPayment};
pub use summary::{LedgerSummary, StatusCounts};
