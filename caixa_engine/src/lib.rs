//! Caixa Engine
//!
//! The sales reconciliation and cash-closing engine of the restaurant back-office. It turns a
//! stream of mutable order records into trustworthy, non-double-counted financial totals, split
//! by channel (delivery vs. dine-in), and lets an operator close a day's register exactly once
//! per channel.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@traits`] and the SQLite backend). You should never
//!    need to access the database directly; use the public APIs. The exception is the data types,
//!    defined in [`mod@db_types`], which are public.
//! 2. The public API ([`mod@recon_api`]): order flow, ledger management, and the
//!    reconciliation/closing service. All three share one [`cache::CacheLayer`], so an
//!    invalidation performed by a mutation is visible to every reader before the mutation
//!    returns.
//! 3. Events ([`mod@events`]): a small hook system emitting `OrderSettledEvent`,
//!    `RegisterClosedEvent` and `LedgerChangedEvent` so other components can react without
//!    being wired into the engine.
pub mod aggregator;
pub mod cache;
pub mod db_types;
pub mod events;
pub mod recon_api;
pub mod traits;

mod sqlite;

pub use recon_api::{ledger_api::LedgerApi, order_flow_api::OrderFlowApi, reconciliation_api::ReconciliationApi};
pub use sqlite::SqliteDatabase;
pub use traits::{ReconciliationDatabase, ReconciliationError};
