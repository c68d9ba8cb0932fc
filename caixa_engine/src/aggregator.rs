//! Pure reduction of settled orders and ledger entries into an [`AggregateSnapshot`].
//!
//! Everything here is deterministic and side-effect-free: two calls over the same inputs yield
//! identical snapshots. The cache layer relies on this when racing recomputes are resolved by
//! last-writer-wins.

use caixa_common::Money;
use chrono::{FixedOffset, NaiveDate};

use crate::db_types::{AggregateSnapshot, Channel, DateRange, LedgerEntry, LedgerKind, MethodTotal, Order};

/// Reduces one business day for one channel.
///
/// Only settled orders of the given channel whose business settlement date (at `offset` from
/// UTC) equals `date` contribute; ledger entries must match the channel and date. Inputs are
/// filtered here rather than trusted, so callers may pass wider result sets.
pub fn aggregate_day(
    date: NaiveDate,
    channel: Channel,
    offset: FixedOffset,
    orders: &[Order],
    entries: &[LedgerEntry],
) -> AggregateSnapshot {
    aggregate(DateRange::single_day(date), channel, offset, orders, entries)
}

/// Reduces an inclusive date range for one channel. The snapshot's `date` field carries the range
/// start; day-keyed consumers always pass a single-day range via [`aggregate_day`].
pub fn aggregate(
    range: DateRange,
    channel: Channel,
    offset: FixedOffset,
    orders: &[Order],
    entries: &[LedgerEntry],
) -> AggregateSnapshot {
    let mut snapshot = AggregateSnapshot::empty(range.start, channel);
    for order in orders {
        if order.channel != channel || !order.status.is_settled() {
            continue;
        }
        let Some(settled) = order.settled_date(offset) else { continue };
        if !range.contains(settled) {
            continue;
        }
        snapshot.order_count += 1;
        snapshot.gross_sales += order.gross_total;
        snapshot.discounts += order.discount;
        snapshot.delivery_fees += order.delivery_fee;
        // A split payment contributes to every bucket it touches, one count per allocation.
        for allocation in &order.payments {
            let bucket = snapshot.payment_breakdown.entry(allocation.method).or_default();
            bucket.count += 1;
            bucket.amount += allocation.amount;
        }
    }
    snapshot.net_sales = snapshot.gross_sales - snapshot.discounts;
    for entry in entries {
        if entry.channel != channel || !range.contains(entry.entry_date) {
            continue;
        }
        match entry.kind {
            LedgerKind::Revenue => snapshot.ledger_revenue += entry.amount,
            LedgerKind::Expense => snapshot.ledger_expense += entry.amount,
        }
    }
    snapshot.balance = snapshot.net_sales + snapshot.ledger_revenue - snapshot.ledger_expense;
    snapshot
}

/// The testable invariant that ties the breakdown to the headline figures: for orders satisfying
/// the payment-allocation rule, Σ buckets ≈ net_sales + delivery_fees.
pub fn breakdown_matches_totals(snapshot: &AggregateSnapshot) -> bool {
    snapshot.breakdown_total().approx_eq(snapshot.net_sales + snapshot.delivery_fees)
}
