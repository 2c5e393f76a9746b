//! `SeaORM` Entity for the leads table.
//!
//! A lead is the ledger's aggregate root. Each track's closure state is
//! flattened into four nullable columns; [`Model::closure_state`] turns
//! them back into a validated state.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use dealflow_core::reconcile::{ClosureColumns, ClosureState, LedgerError, Track};

use super::sea_orm_active_enums::LedgerStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub customer_name: Option<String>,
    pub total_amount_to_credit: Decimal,
    #[sea_orm(column_type = "Text", nullable)]
    pub payment_timeline: Option<String>,
    pub payment_ledger_closed_by_sales_id: Option<Uuid>,
    pub payment_ledger_closed_by_finance_id: Option<Uuid>,
    pub payment_ledger_closed_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub payment_ledger_closure_notes: Option<String>,
    pub document_ledger_closed_by_sales_id: Option<Uuid>,
    pub document_ledger_closed_by_finance_id: Option<Uuid>,
    pub document_ledger_closed_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub document_ledger_closure_notes: Option<String>,
    pub ledger_status: LedgerStatus,
    pub opened_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payment_entries::Entity")]
    PaymentEntries,
    #[sea_orm(has_many = "super::document_entries::Entity")]
    DocumentEntries,
}

impl Related<super::payment_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentEntries.def()
    }
}

impl Related<super::document_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocumentEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Raw closure columns of one track.
    #[must_use]
    pub fn closure_columns(&self, track: Track) -> ClosureColumns {
        let (sales, finance, closed_at, notes) = match track {
            Track::Payment => (
                self.payment_ledger_closed_by_sales_id,
                self.payment_ledger_closed_by_finance_id,
                self.payment_ledger_closed_at,
                &self.payment_ledger_closure_notes,
            ),
            Track::Document => (
                self.document_ledger_closed_by_sales_id,
                self.document_ledger_closed_by_finance_id,
                self.document_ledger_closed_at,
                &self.document_ledger_closure_notes,
            ),
        };
        ClosureColumns {
            closed_by_sales_id: sales,
            closed_by_finance_id: finance,
            closed_at: closed_at.map(|at| at.to_utc()),
            notes: notes.clone(),
        }
    }

    /// Validated closure state of one track.
    ///
    /// # Errors
    ///
    /// `InconsistentClosure` if the stored columns form an illegal
    /// combination.
    pub fn closure_state(&self, track: Track) -> Result<ClosureState, LedgerError> {
        ClosureState::from_columns(track, self.closure_columns(track))
    }
}

/// Column handles for one track's closure fields.
#[derive(Debug, Clone, Copy)]
pub struct TrackColumns {
    pub closed_by_sales_id: Column,
    pub closed_by_finance_id: Column,
    pub closed_at: Column,
    pub closure_notes: Column,
}

impl TrackColumns {
    /// Columns backing `track`.
    #[must_use]
    pub const fn of(track: Track) -> Self {
        match track {
            Track::Payment => Self {
                closed_by_sales_id: Column::PaymentLedgerClosedBySalesId,
                closed_by_finance_id: Column::PaymentLedgerClosedByFinanceId,
                closed_at: Column::PaymentLedgerClosedAt,
                closure_notes: Column::PaymentLedgerClosureNotes,
            },
            Track::Document => Self {
                closed_by_sales_id: Column::DocumentLedgerClosedBySalesId,
                closed_by_finance_id: Column::DocumentLedgerClosedByFinanceId,
                closed_at: Column::DocumentLedgerClosedAt,
                closure_notes: Column::DocumentLedgerClosureNotes,
            },
        }
    }
}
