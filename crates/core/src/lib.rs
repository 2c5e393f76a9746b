//! Core business logic for Dealflow.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! The reconciliation rules live here; the `dealflow-db` crate applies them as
//! atomic store mutations.
//!
//! # Modules
//!
//! - `reconcile` - Payment/document ledger reconciliation and two-phase closure

pub mod reconcile;
