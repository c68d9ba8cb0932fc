use serde::{Deserialize, Serialize};

use crate::db_types::{ClosingRecord, LedgerEntry, Order};

/// Fired when an order reaches a settled terminal status. The cache for the order's
/// (settled date, channel) key has already been invalidated by the time this fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSettledEvent {
    pub order: Order,
}

impl OrderSettledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Fired after any ledger entry create, update or delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerChangedEvent {
    pub entry: LedgerEntry,
}

impl LedgerChangedEvent {
    pub fn new(entry: LedgerEntry) -> Self {
        Self { entry }
    }
}

/// Fired when a register is closed for a (date, channel) key. Only the call that actually
/// persisted the closing fires this; idempotent retries do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterClosedEvent {
    pub record: ClosingRecord,
}

impl RegisterClosedEvent {
    pub fn new(record: ClosingRecord) -> Self {
        Self { record }
    }
}
