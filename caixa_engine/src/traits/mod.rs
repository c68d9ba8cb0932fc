//! # Database management and control.
//!
//! This module defines the interface contract that reconciliation database *backends* must
//! implement. The engine never talks SQL itself; the public APIs in [`crate::recon_api`] drive a
//! [`ReconciliationDatabase`] implementation and layer the cache, locking and event concerns on
//! top of it.
//!
//! Backends own atomicity: every mutating trait method is a single transaction, so a rejected
//! order transition or a failed closing never partially applies.
mod reconciliation_database;

pub use reconciliation_database::{ReconciliationDatabase, ReconciliationError};
