//! `SeaORM` Entity for the document_entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use dealflow_core::reconcile::{DocumentApproval, SideApproval};

use super::sea_orm_active_enums::EntryStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub lead_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub note: String,
    pub attachment_url: String,
    pub attachment_type: String,
    pub uploader_id: Uuid,
    pub sales_approved: bool,
    /// Last Sales reviewer and time, set by approvals and rejections alike.
    pub sales_reviewed_by: Option<Uuid>,
    pub sales_reviewed_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub sales_notes: Option<String>,
    pub finance_approved: bool,
    /// Last Finance reviewer and time, set by approvals and rejections alike.
    pub finance_reviewed_by: Option<Uuid>,
    pub finance_reviewed_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub finance_notes: Option<String>,
    pub status: EntryStatus,
    pub version: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::leads::Entity",
        from = "Column::LeadId",
        to = "super::leads::Column::Id",
        on_delete = "Cascade"
    )]
    Leads,
}

impl Related<super::leads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Leads.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The entry's two approval sides as a core value.
    #[must_use]
    pub fn approval(&self) -> DocumentApproval {
        DocumentApproval {
            status: self.status.into(),
            sales: SideApproval {
                approved: self.sales_approved,
                reviewed_by: self.sales_reviewed_by,
                reviewed_at: self.sales_reviewed_at.map(|at| at.to_utc()),
                notes: self.sales_notes.clone(),
            },
            finance: SideApproval {
                approved: self.finance_approved,
                reviewed_by: self.finance_reviewed_by,
                reviewed_at: self.finance_reviewed_at.map(|at| at.to_utc()),
                notes: self.finance_notes.clone(),
            },
        }
    }
}
