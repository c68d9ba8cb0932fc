use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    cache::CacheLayer,
    db_types::{business_today, NewOrder, Order, OrderId, OrderStatus},
    events::{EventProducers, OrderSettledEvent},
    traits::{ReconciliationDatabase, ReconciliationError},
};

/// `OrderFlowApi` is the primary API for moving orders through the status lifecycle.
///
/// Its central responsibility is the settlement step: a transition into `Delivered` or
/// `ClosedTab` validates the payment-allocation invariant, stamps `settled_at`, and invalidates
/// the aggregate cache for the affected (date, channel) key *before* the call returns. That
/// in-band invalidation is what keeps dashboard totals honest immediately after an operator
/// marks an order delivered.
pub struct OrderFlowApi<B> {
    db: B,
    cache: Arc<CacheLayer>,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, cache: Arc<CacheLayer>, producers: EventProducers) -> Self {
        Self { db, cache, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: ReconciliationDatabase
{
    /// Submit a new order. Idempotent: re-submitting an existing `order_id` returns the stored
    /// order and `false`. New orders enter the lifecycle as `Pending` and do not touch the
    /// aggregate cache; only settlement does.
    pub async fn process_new_order(&self, order: NewOrder) -> Result<(Order, bool), ReconciliationError> {
        let oid = order.order_id.clone();
        let (order, inserted) = self.db.insert_order(order).await?;
        debug!("🔄️📦️ Order [{oid}] processed. Inserted: {inserted}");
        Ok((order, inserted))
    }

    pub async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, ReconciliationError> {
        self.db.fetch_order_by_order_id(order_id).await
    }

    /// Changes the status of an order.
    ///
    /// Legality is decided by [`OrderStatus::can_transition_to`] for the order's channel;
    /// transitions are one-directional and settled states are final. A transition into a settled
    /// label has these side effects, all before this function returns:
    ///
    /// * The payment-allocation invariant is validated (a mismatch rejects the transition with no
    ///   state change).
    /// * `settled_at` is stamped inside the same transaction as the status write.
    /// * The cache key for (settlement date, channel) is invalidated.
    /// * An `OrderSettledEvent` is published.
    ///
    /// Settlement runs under the per-(date, channel) lock so it cannot interleave with a closing
    /// for the same key.
    pub async fn transition_order(&self, order_id: &OrderId, new_status: OrderStatus) -> Result<Order, ReconciliationError> {
        if new_status.is_settled() {
            return self.settle_order(order_id, new_status).await;
        }
        let order = self.db.transition_order(order_id, new_status).await?;
        if new_status == OrderStatus::Cancelled {
            debug!("🔄️📦️ Order [{order_id}] cancelled");
        }
        Ok(order)
    }

    async fn settle_order(&self, order_id: &OrderId, new_status: OrderStatus) -> Result<Order, ReconciliationError> {
        let existing = self
            .db
            .fetch_order_by_order_id(order_id)
            .await?
            .ok_or_else(|| ReconciliationError::OrderNotFound(order_id.clone()))?;
        // Settlement stamps "now", so today's key is the one to serialise against. The actual
        // stamped date is read back afterwards in case midnight passed in between.
        let offset = self.db.business_offset();
        let expected_key = (business_today(offset), existing.channel);
        let _guard = self.cache.locks.acquire(expected_key).await?;
        let order = self.db.transition_order(order_id, new_status).await?;
        self.cache.cache.invalidate(expected_key);
        if let Some(settled) = order.settled_date(offset) {
            if settled != expected_key.0 {
                self.cache.cache.invalidate((settled, order.channel));
            }
        }
        debug!("🔄️📦️ Order [{order_id}] settled as {new_status}; cache invalidated for {} {}", expected_key.0, order.channel);
        self.call_order_settled_hook(&order).await;
        Ok(order)
    }

    /// Applies a batch of transitions, each handled independently. A failure in one order does
    /// not stop the sweep; invalidation stays synchronous per mutation, and the lazy cache means
    /// a bulk settle triggers no recompute storm.
    pub async fn transition_orders(
        &self,
        transitions: &[(OrderId, OrderStatus)],
    ) -> Vec<(OrderId, Result<Order, ReconciliationError>)> {
        let mut results = Vec::with_capacity(transitions.len());
        for (order_id, new_status) in transitions {
            let result = self.transition_order(order_id, *new_status).await;
            if let Err(e) = &result {
                warn!("🔄️📦️ Bulk transition of [{order_id}] to {new_status} failed: {e}");
            }
            results.push((order_id.clone(), result));
        }
        results
    }

    async fn call_order_settled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_settled_producer {
            trace!("🔄️📦️ Notifying order settled hook subscribers");
            emitter.publish_event(OrderSettledEvent::new(order.clone())).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
