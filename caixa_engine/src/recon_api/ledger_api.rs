use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    cache::{CacheKey, CacheLayer},
    db_types::{Channel, DateRange, LedgerEntry, NewLedgerEntry},
    events::{EventProducers, LedgerChangedEvent},
    traits::{ReconciliationDatabase, ReconciliationError},
};

/// `LedgerApi` manages ad-hoc expense/revenue entries.
///
/// Every mutation invalidates the aggregate cache for the affected (date, channel) key(s) before
/// returning, under the same per-key locks the closing path uses; an edit to a ledger entry is
/// exactly as invalidating as an order settling.
pub struct LedgerApi<B> {
    db: B,
    cache: Arc<CacheLayer>,
    producers: EventProducers,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi")
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B, cache: Arc<CacheLayer>, producers: EventProducers) -> Self {
        Self { db, cache, producers }
    }
}

impl<B> LedgerApi<B>
where B: ReconciliationDatabase
{
    pub async fn add_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, ReconciliationError> {
        let key: CacheKey = (entry.entry_date, entry.channel);
        let _guard = self.cache.locks.acquire(key).await?;
        let inserted = self.db.insert_ledger_entry(entry).await?;
        self.cache.cache.invalidate(key);
        self.call_ledger_changed_hook(&inserted).await;
        Ok(inserted)
    }

    /// Updates an entry. If the edit moves the entry to another date or channel, both the old and
    /// the new (date, channel) keys are locked (in a canonical order) and invalidated.
    pub async fn update_entry(&self, id: i64, entry: NewLedgerEntry) -> Result<LedgerEntry, ReconciliationError> {
        let current = self.db.fetch_ledger_entry(id).await?.ok_or(ReconciliationError::LedgerEntryNotFound(id))?;
        let mut keys: Vec<CacheKey> = vec![(current.entry_date, current.channel), (entry.entry_date, entry.channel)];
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            guards.push(self.cache.locks.acquire(*key).await?);
        }
        let (old, new) = self.db.update_ledger_entry(id, entry).await?;
        self.cache.cache.invalidate((old.entry_date, old.channel));
        self.cache.cache.invalidate((new.entry_date, new.channel));
        debug!("📒️ Ledger entry {id} updated");
        self.call_ledger_changed_hook(&new).await;
        Ok(new)
    }

    pub async fn delete_entry(&self, id: i64) -> Result<LedgerEntry, ReconciliationError> {
        let current = self.db.fetch_ledger_entry(id).await?.ok_or(ReconciliationError::LedgerEntryNotFound(id))?;
        let key: CacheKey = (current.entry_date, current.channel);
        let _guard = self.cache.locks.acquire(key).await?;
        let deleted = self.db.delete_ledger_entry(id).await?;
        self.cache.cache.invalidate(key);
        debug!("📒️ Ledger entry {id} deleted");
        self.call_ledger_changed_hook(&deleted).await;
        Ok(deleted)
    }

    pub async fn entries(&self, range: DateRange, channel: Option<Channel>) -> Result<Vec<LedgerEntry>, ReconciliationError> {
        self.db.fetch_ledger_entries(range, channel).await
    }

    async fn call_ledger_changed_hook(&self, entry: &LedgerEntry) {
        for emitter in &self.producers.ledger_changed_producer {
            trace!("📒️ Notifying ledger changed hook subscribers");
            emitter.publish_event(LedgerChangedEvent::new(entry.clone())).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
