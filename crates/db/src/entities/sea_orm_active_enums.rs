//! Status enums persisted as short strings.
//!
//! Stored as text rather than native database enums so the same schema runs
//! on Postgres and SQLite.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use dealflow_core::reconcile as core;

/// Approval status of a payment or document entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

/// Overall ledger status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "CLOSED")]
    Closed,
}

impl From<EntryStatus> for core::EntryStatus {
    fn from(status: EntryStatus) -> Self {
        match status {
            EntryStatus::Pending => Self::Pending,
            EntryStatus::Approved => Self::Approved,
            EntryStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<core::EntryStatus> for EntryStatus {
    fn from(status: core::EntryStatus) -> Self {
        match status {
            core::EntryStatus::Pending => Self::Pending,
            core::EntryStatus::Approved => Self::Approved,
            core::EntryStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<LedgerStatus> for core::LedgerStatus {
    fn from(status: LedgerStatus) -> Self {
        match status {
            LedgerStatus::Active => Self::Active,
            LedgerStatus::Closed => Self::Closed,
        }
    }
}

impl From<core::LedgerStatus> for LedgerStatus {
    fn from(status: core::LedgerStatus) -> Self {
        match status {
            core::LedgerStatus::Active => Self::Active,
            core::LedgerStatus::Closed => Self::Closed,
        }
    }
}
