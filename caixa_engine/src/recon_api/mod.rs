//! # The reconciliation engine public API
//!
//! This module provides the public-facing functionality of the engine, layered over any
//! [`crate::traits::ReconciliationDatabase`] backend:
//!
//! * [`OrderFlowApi`](order_flow_api::OrderFlowApi) drives orders through the status lifecycle
//!   and keeps the aggregate cache honest when they settle.
//! * [`LedgerApi`](ledger_api::LedgerApi) manages ad-hoc expense/revenue entries, with the same
//!   invalidation guarantees as order mutations.
//! * [`ReconciliationApi`](reconciliation_api::ReconciliationApi) serves aggregates (live or
//!   frozen) and performs the idempotent register closing.
//!
//! The three APIs share one [`crate::cache::CacheLayer`] so that invalidation performed by a
//! mutation is immediately visible to every reader.
pub mod ledger_api;
pub mod order_flow_api;
pub mod reconciliation_api;
