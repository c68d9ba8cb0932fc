use std::{fmt::Debug, sync::Arc};

use chrono::NaiveDate;
use log::*;

use crate::{
    aggregator,
    cache::{CacheKey, CacheLayer},
    db_types::{business_today, AggregateSnapshot, Channel, ClosingRecord, DailySummary, DateRange},
    events::{EventProducers, RegisterClosedEvent},
    traits::{ReconciliationDatabase, ReconciliationError},
};

/// `ReconciliationApi` is the read-and-close face of the engine.
///
/// Reads are dual-path: a closed (date, channel) key always serves its frozen snapshot, an open
/// key serves the live aggregate through the cache. Closing is irreversible and idempotent:
/// retried or concurrent close calls all receive the same frozen snapshot, and exactly one
/// closing record ever exists per key.
pub struct ReconciliationApi<B> {
    db: B,
    cache: Arc<CacheLayer>,
    producers: EventProducers,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B, cache: Arc<CacheLayer>, producers: EventProducers) -> Self {
        Self { db, cache, producers }
    }
}

impl<B> ReconciliationApi<B>
where B: ReconciliationDatabase
{
    /// The one read API the rest of the application uses: frozen snapshot if the register is
    /// closed for the key, live (possibly recomputed) aggregate otherwise. "Today, still open"
    /// and "last week, closed" both render correctly through this call.
    pub async fn read(&self, date: NaiveDate, channel: Channel) -> Result<AggregateSnapshot, ReconciliationError> {
        if let Some(record) = self.db.fetch_closing(date, channel).await? {
            trace!("🔎️ Serving frozen snapshot for {date} {channel}");
            return Ok(record.snapshot);
        }
        self.live_aggregate(date, channel).await
    }

    /// Both channels of one day, side by side, each through the dual-path read.
    pub async fn daily_summary(&self, date: NaiveDate) -> Result<DailySummary, ReconciliationError> {
        let delivery = self.read(date, Channel::Delivery).await?;
        let dine_in = self.read(date, Channel::DineIn).await?;
        Ok(DailySummary { date, delivery, dine_in })
    }

    /// Closes the register for `(date, channel)`, freezing the aggregate as computed now.
    ///
    /// Refused for future dates. If the key is already closed the call is idempotent: it returns
    /// the existing record unchanged. It does not recompute, and it is not an error, but it is
    /// logged as a notable event for audit. If the aggregate computation fails, nothing is
    /// persisted.
    pub async fn close(
        &self,
        date: NaiveDate,
        channel: Channel,
        operator_note: Option<String>,
    ) -> Result<ClosingRecord, ReconciliationError> {
        if date > business_today(self.db.business_offset()) {
            return Err(ReconciliationError::FutureClosingDate(date));
        }
        let key: CacheKey = (date, channel);
        let _guard = self.cache.locks.acquire(key).await?;
        if let Some(existing) = self.db.fetch_closing(date, channel).await? {
            warn!("🔐️ Double-close attempt for {date} {channel}; returning the existing frozen snapshot");
            return Ok(existing);
        }
        let snapshot = self.compute_locked(key).await?;
        let (record, inserted) = self.db.insert_closing(date, channel, operator_note, snapshot).await?;
        if inserted {
            info!("🔐️ Register closed for {date} {channel}: balance {}", record.snapshot.balance);
            self.call_register_closed_hook(&record).await;
        } else {
            // The UNIQUE constraint caught a race our lock did not cover (e.g. two processes).
            warn!("🔐️ Concurrent close for {date} {channel} lost the insert race; returning the persisted record");
        }
        Ok(record)
    }

    /// Closing records in `range`, ordered by date then channel.
    pub async fn closing_history(&self, range: DateRange) -> Result<Vec<ClosingRecord>, ReconciliationError> {
        self.db.fetch_closings(range).await
    }

    /// Computes an aggregate directly from the stores, bypassing both the cache and any frozen
    /// snapshot. This is the audit path: after a day is closed, late mutations still show up
    /// here while [`read`](Self::read) keeps serving the frozen snapshot.
    pub async fn aggregate(&self, range: DateRange, channel: Channel) -> Result<AggregateSnapshot, ReconciliationError> {
        let orders = self.db.fetch_settled_orders(range, channel).await?;
        let entries = self.db.fetch_ledger_entries(range, Some(channel)).await?;
        Ok(aggregator::aggregate(range, channel, self.db.business_offset(), &orders, &entries))
    }

    /// The live (open-day) read path: cache hit, or recompute under the key lock.
    pub async fn live_aggregate(&self, date: NaiveDate, channel: Channel) -> Result<AggregateSnapshot, ReconciliationError> {
        let key: CacheKey = (date, channel);
        if let Some(snapshot) = self.cache.cache.get(key) {
            return Ok(snapshot);
        }
        let _guard = self.cache.locks.acquire(key).await?;
        self.compute_locked(key).await
    }

    /// Recomputes `key` and populates the cache. Caller must hold the key lock. A store failure
    /// propagates without touching the cache, so a retry starts clean and a zeroed snapshot is
    /// never served as if authoritative.
    async fn compute_locked(&self, key: CacheKey) -> Result<AggregateSnapshot, ReconciliationError> {
        // A racing reader may have populated the entry while we waited on the lock.
        if let Some(snapshot) = self.cache.cache.get(key) {
            return Ok(snapshot);
        }
        let (date, channel) = key;
        let generation = self.cache.cache.generation(key);
        let range = DateRange::single_day(date);
        let orders = self.db.fetch_settled_orders(range, channel).await?;
        let entries = self.db.fetch_ledger_entries(range, Some(channel)).await?;
        let snapshot = aggregator::aggregate_day(date, channel, self.db.business_offset(), &orders, &entries);
        self.cache.cache.put_if_current(key, generation, snapshot.clone());
        Ok(snapshot)
    }

    async fn call_register_closed_hook(&self, record: &ClosingRecord) {
        for emitter in &self.producers.register_closed_producer {
            trace!("🔐️ Notifying register closed hook subscribers");
            emitter.publish_event(RegisterClosedEvent::new(record.clone())).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
