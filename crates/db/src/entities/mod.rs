//! `SeaORM` entity definitions for the ledger store.

pub mod document_entries;
pub mod leads;
pub mod payment_entries;
pub mod sea_orm_active_enums;

pub mod prelude {
    //! Entity re-exports.
    pub use super::document_entries::Entity as DocumentEntries;
    pub use super::leads::Entity as Leads;
    pub use super::payment_entries::Entity as PaymentEntries;
}
