//! Ledger schema: leads, payment entries, document entries.
//!
//! Built with the schema builder so the same migration runs on Postgres
//! and SQLite.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Leads {
    Table,
    Id,
    Title,
    CustomerName,
    TotalAmountToCredit,
    PaymentTimeline,
    PaymentLedgerClosedBySalesId,
    PaymentLedgerClosedByFinanceId,
    PaymentLedgerClosedAt,
    PaymentLedgerClosureNotes,
    DocumentLedgerClosedBySalesId,
    DocumentLedgerClosedByFinanceId,
    DocumentLedgerClosedAt,
    DocumentLedgerClosureNotes,
    LedgerStatus,
    OpenedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PaymentEntries {
    Table,
    Id,
    LeadId,
    Amount,
    Note,
    AttachmentUrl,
    AttachmentType,
    Status,
    UploaderId,
    VerifiedById,
    VerifiedAt,
    FinanceNotes,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DocumentEntries {
    Table,
    Id,
    LeadId,
    Note,
    AttachmentUrl,
    AttachmentType,
    UploaderId,
    SalesApproved,
    SalesReviewedBy,
    SalesReviewedAt,
    SalesNotes,
    FinanceApproved,
    FinanceReviewedBy,
    FinanceReviewedAt,
    FinanceNotes,
    Status,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Leads::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Leads::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Leads::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Leads::CustomerName).string_len(255))
                    .col(
                        ColumnDef::new(Leads::TotalAmountToCredit)
                            .decimal()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Leads::PaymentTimeline).text())
                    .col(ColumnDef::new(Leads::PaymentLedgerClosedBySalesId).uuid())
                    .col(ColumnDef::new(Leads::PaymentLedgerClosedByFinanceId).uuid())
                    .col(ColumnDef::new(Leads::PaymentLedgerClosedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Leads::PaymentLedgerClosureNotes).text())
                    .col(ColumnDef::new(Leads::DocumentLedgerClosedBySalesId).uuid())
                    .col(ColumnDef::new(Leads::DocumentLedgerClosedByFinanceId).uuid())
                    .col(ColumnDef::new(Leads::DocumentLedgerClosedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Leads::DocumentLedgerClosureNotes).text())
                    .col(
                        ColumnDef::new(Leads::LedgerStatus)
                            .string_len(16)
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(ColumnDef::new(Leads::OpenedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Leads::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Leads::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_leads_status_created")
                    .table(Leads::Table)
                    .col(Leads::LedgerStatus)
                    .col(Leads::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentEntries::LeadId).uuid().not_null())
                    .col(
                        ColumnDef::new(PaymentEntries::Amount)
                            .decimal()
                            .not_null()
                            .check(Expr::col(PaymentEntries::Amount).gt(0)),
                    )
                    .col(ColumnDef::new(PaymentEntries::Note).text().not_null())
                    .col(ColumnDef::new(PaymentEntries::AttachmentUrl).text())
                    .col(ColumnDef::new(PaymentEntries::AttachmentType).string_len(128))
                    .col(
                        ColumnDef::new(PaymentEntries::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(PaymentEntries::UploaderId).uuid().not_null())
                    .col(ColumnDef::new(PaymentEntries::VerifiedById).uuid())
                    .col(ColumnDef::new(PaymentEntries::VerifiedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(PaymentEntries::FinanceNotes).text())
                    .col(
                        ColumnDef::new(PaymentEntries::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PaymentEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentEntries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_entries_lead")
                            .from(PaymentEntries::Table, PaymentEntries::LeadId)
                            .to(Leads::Table, Leads::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_entries_lead_status")
                    .table(PaymentEntries::Table)
                    .col(PaymentEntries::LeadId)
                    .col(PaymentEntries::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DocumentEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DocumentEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DocumentEntries::LeadId).uuid().not_null())
                    .col(ColumnDef::new(DocumentEntries::Note).text().not_null())
                    .col(ColumnDef::new(DocumentEntries::AttachmentUrl).text().not_null())
                    .col(
                        ColumnDef::new(DocumentEntries::AttachmentType)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DocumentEntries::UploaderId).uuid().not_null())
                    .col(
                        ColumnDef::new(DocumentEntries::SalesApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(DocumentEntries::SalesReviewedBy).uuid())
                    .col(ColumnDef::new(DocumentEntries::SalesReviewedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(DocumentEntries::SalesNotes).text())
                    .col(
                        ColumnDef::new(DocumentEntries::FinanceApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(DocumentEntries::FinanceReviewedBy).uuid())
                    .col(
                        ColumnDef::new(DocumentEntries::FinanceReviewedAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(DocumentEntries::FinanceNotes).text())
                    .col(
                        ColumnDef::new(DocumentEntries::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(DocumentEntries::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DocumentEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DocumentEntries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_document_entries_lead")
                            .from(DocumentEntries::Table, DocumentEntries::LeadId)
                            .to(Leads::Table, Leads::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_document_entries_lead_status")
                    .table(DocumentEntries::Table)
                    .col(DocumentEntries::LeadId)
                    .col(DocumentEntries::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DocumentEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PaymentEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Leads::Table).to_owned())
            .await?;
        Ok(())
    }
}
