//! Optimistic retry loop for version-guarded entry updates.

use std::future::Future;

use tracing::warn;
use uuid::Uuid;

use dealflow_core::reconcile::LedgerError;

use super::ledger::MAX_CAS_ATTEMPTS;

/// Outcome of one compare-and-swap attempt.
#[derive(Debug)]
pub(super) enum Attempt<T> {
    Done(T),
    /// The row's version moved since it was read; nothing was written.
    Conflict,
}

/// Runs `attempt` until it stops conflicting, at most [`MAX_CAS_ATTEMPTS`]
/// times. Errors end the loop immediately.
pub(super) async fn retry_on_conflict<T, F, Fut>(
    entry_id: Uuid,
    mut attempt: F,
) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt<T>, LedgerError>>,
{
    for n in 1..=MAX_CAS_ATTEMPTS {
        match attempt().await? {
            Attempt::Done(value) => return Ok(value),
            Attempt::Conflict => {
                warn!(entry_id = %entry_id, attempt = n, "entry changed concurrently");
            }
        }
    }

    Err(LedgerError::ConcurrentModification)
}
