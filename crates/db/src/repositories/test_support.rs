//! In-memory store for repository unit tests.

use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use dealflow_core::reconcile::{Caller, Role, RoleSet};

use crate::migration::Migrator;

use super::{LedgerRepository, NewLedger};

pub(super) async fn memory_repo() -> LedgerRepository {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.expect("connect sqlite");
    Migrator::up(&db, None).await.expect("migrate");
    LedgerRepository::new(db)
}

pub(super) fn caller(role: Role) -> Caller {
    Caller::new(Uuid::new_v4(), RoleSet::new([role]))
}

pub(super) fn new_ledger(title: &str) -> NewLedger {
    NewLedger {
        lead_id: Uuid::new_v4(),
        title: title.to_string(),
        customer_name: None,
    }
}
