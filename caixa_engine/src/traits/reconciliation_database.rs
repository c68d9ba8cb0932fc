use caixa_common::Money;
use chrono::{FixedOffset, NaiveDate};
use thiserror::Error;

use crate::db_types::{
    AggregateSnapshot,
    Channel,
    ClosingRecord,
    DateRange,
    LedgerEntry,
    NewLedgerEntry,
    NewOrder,
    Order,
    OrderId,
    OrderStatus,
};

/// The storage contract for the reconciliation engine.
///
/// Implementations persist orders (with their payment allocations), ledger entries and closing
/// records. Each mutating method is atomic: it either fully applies or leaves the store
/// unchanged. Validation that depends on stored state (the status state machine, the
/// payment-allocation invariant) happens inside the same transaction as the write.
#[allow(async_fn_in_trait)]
pub trait ReconciliationDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// The fixed offset from UTC at which this store's business day ticks over. Every date
    /// attribution (settlement dates, "today") derives from this offset, so a late-evening
    /// settlement west of Greenwich lands on the local day rather than the next UTC day.
    fn business_offset(&self) -> FixedOffset;

    /// Stores a new order. This call is idempotent: if an order with the same `order_id` already
    /// exists, the existing record is returned and the second element is `false`.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), ReconciliationError>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, ReconciliationError>;

    /// Applies a status transition in a single transaction.
    ///
    /// The transition is validated against [`OrderStatus::can_transition_to`] for the order's
    /// channel. A transition into a settled label additionally validates the payment-allocation
    /// invariant and stamps `settled_at`; if validation fails, nothing is written.
    ///
    /// Returns the updated order.
    async fn transition_order(&self, order_id: &OrderId, new_status: OrderStatus) -> Result<Order, ReconciliationError>;

    /// All settled orders whose business date (per [`business_offset`](Self::business_offset))
    /// falls in `range`, for one channel.
    async fn fetch_settled_orders(&self, range: DateRange, channel: Channel) -> Result<Vec<Order>, ReconciliationError>;

    /// Stores a new ledger entry. The amount must be strictly positive.
    async fn insert_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, ReconciliationError>;

    async fn fetch_ledger_entry(&self, id: i64) -> Result<Option<LedgerEntry>, ReconciliationError>;

    /// Replaces the mutable fields of a ledger entry. Returns the entry before and after the
    /// update so the caller can invalidate both affected (date, channel) keys.
    async fn update_ledger_entry(
        &self,
        id: i64,
        entry: NewLedgerEntry,
    ) -> Result<(LedgerEntry, LedgerEntry), ReconciliationError>;

    /// Deletes a ledger entry, returning the deleted record.
    async fn delete_ledger_entry(&self, id: i64) -> Result<LedgerEntry, ReconciliationError>;

    async fn fetch_ledger_entries(
        &self,
        range: DateRange,
        channel: Option<Channel>,
    ) -> Result<Vec<LedgerEntry>, ReconciliationError>;

    /// Persists a closing record for `(date, channel)` unless one already exists.
    ///
    /// This call is idempotent: a concurrent or repeated close finds the existing row and returns
    /// it with `false`; the frozen snapshot is never overwritten.
    async fn insert_closing(
        &self,
        date: NaiveDate,
        channel: Channel,
        operator_note: Option<String>,
        snapshot: AggregateSnapshot,
    ) -> Result<(ClosingRecord, bool), ReconciliationError>;

    async fn fetch_closing(&self, date: NaiveDate, channel: Channel) -> Result<Option<ClosingRecord>, ReconciliationError>;

    /// Closing records whose date falls in `range`, ordered by date then channel.
    async fn fetch_closings(&self, range: DateRange) -> Result<Vec<ClosingRecord>, ReconciliationError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), ReconciliationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    /// The backing store failed or is unreachable. Retryable; never to be papered over with a
    /// zeroed snapshot.
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested ledger entry (id {0}) does not exist")]
    LedgerEntryNotFound(i64),
    #[error("Cannot transition an order from {from} to {to} on the {channel} channel")]
    InvalidTransition { from: OrderStatus, to: OrderStatus, channel: Channel },
    #[error("Payment allocations total {actual}, but the order settles for {expected}")]
    PaymentMismatch { expected: Money, actual: Money },
    #[error("Ledger amounts must be positive, got {0}")]
    AmountNotPositive(Money),
    #[error("Invalid date range: start falls after end")]
    InvalidDateRange,
    #[error("Cannot close the register for the future date {0}")]
    FutureClosingDate(NaiveDate),
    /// The per-key lock could not be acquired within its bound. Retryable.
    #[error("Another operation holds the register lock for this date and channel. Try again")]
    LockTimeout,
}

impl ReconciliationError {
    /// Whether the caller can expect a retry of the same call to succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReconciliationError::DatabaseError(_) | ReconciliationError::LockTimeout)
    }
}

impl From<sqlx::Error> for ReconciliationError {
    fn from(e: sqlx::Error) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}
