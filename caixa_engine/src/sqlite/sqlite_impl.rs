//! `SqliteDatabase` is a concrete implementation of a reconciliation engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the [`ReconciliationDatabase`]
//! trait. All validation that depends on stored state (the status state machine, the
//! payment-allocation invariant) runs inside the same transaction as the write, so a rejected
//! transition never partially applies.
use std::fmt::Debug;

use chrono::{FixedOffset, NaiveDate};
use log::debug;
use sqlx::SqlitePool;

use super::db::{closings, db_url, ledger, new_pool, orders, utc_offset};
use crate::{
    db_types::{
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
    },
    traits::{ReconciliationDatabase, ReconciliationError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    offset: FixedOffset,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new connection pool against the database at `CAIXA_DATABASE_URL`, with the
    /// business-day offset from `CAIXA_UTC_OFFSET`.
    pub async fn new(max_connections: u32) -> Result<Self, ReconciliationError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections, utc_offset()).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32, offset: FixedOffset) -> Result<Self, ReconciliationError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool, offset })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to run on every startup.
    pub async fn migrate(&self) -> Result<(), ReconciliationError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ReconciliationError::DatabaseError(e.to_string()))
    }
}

impl ReconciliationDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    fn business_offset(&self) -> FixedOffset {
        self.offset
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::idempotent_insert(order, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn transition_order(&self, order_id: &OrderId, new_status: OrderStatus) -> Result<Order, ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| ReconciliationError::OrderNotFound(order_id.clone()))?;
        if !order.status.can_transition_to(new_status, order.channel) {
            return Err(ReconciliationError::InvalidTransition {
                from: order.status,
                to: new_status,
                channel: order.channel,
            });
        }
        if new_status.is_settled() && !order.payments_balance() {
            return Err(ReconciliationError::PaymentMismatch {
                expected: order.settled_total(),
                actual: order.payments_total(),
            });
        }
        orders::set_status(order_id, new_status, &mut tx).await?;
        let updated = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| ReconciliationError::OrderNotFound(order_id.clone()))?;
        tx.commit().await?;
        debug!("🗃️ Order [{order_id}] moved from {} to {new_status}", order.status);
        Ok(updated)
    }

    async fn fetch_settled_orders(&self, range: DateRange, channel: Channel) -> Result<Vec<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_settled_orders(range, channel, self.offset, &mut conn).await
    }

    async fn insert_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        let inserted = ledger::insert_entry(entry, &mut tx).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn fetch_ledger_entry(&self, id: i64) -> Result<Option<LedgerEntry>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let entry = ledger::fetch_entry(id, &mut conn).await?;
        Ok(entry)
    }

    async fn update_ledger_entry(
        &self,
        id: i64,
        entry: NewLedgerEntry,
    ) -> Result<(LedgerEntry, LedgerEntry), ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        let result = ledger::update_entry(id, entry, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn delete_ledger_entry(&self, id: i64) -> Result<LedgerEntry, ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        let deleted = ledger::delete_entry(id, &mut tx).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn fetch_ledger_entries(
        &self,
        range: DateRange,
        channel: Option<Channel>,
    ) -> Result<Vec<LedgerEntry>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        ledger::fetch_entries(range, channel, &mut conn).await
    }

    async fn insert_closing(
        &self,
        date: NaiveDate,
        channel: Channel,
        operator_note: Option<String>,
        snapshot: AggregateSnapshot,
    ) -> Result<(ClosingRecord, bool), ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        let result = closings::idempotent_insert(date, channel, operator_note, &snapshot, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_closing(&self, date: NaiveDate, channel: Channel) -> Result<Option<ClosingRecord>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        closings::fetch_closing(date, channel, &mut conn).await
    }

    async fn fetch_closings(&self, range: DateRange) -> Result<Vec<ClosingRecord>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        closings::fetch_closings(range, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), ReconciliationError> {
        self.pool.close().await;
        Ok(())
    }
}
