//! Ledger entries feed the day's balance, and every ledger mutation invalidates the aggregates
//! it touches before the call returns.
mod support;

use caixa_common::Money;
use caixa_engine::{
    db_types::{Channel, DateRange, LedgerKind, NewLedgerEntry, NewOrder, OrderId, OrderStatus, PaymentMethod},
    ReconciliationError,
};
use chrono::{NaiveDate, Utc};
use support::new_engine;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn expense(entry_date: NaiveDate, channel: Channel, cents: i64, desc: &str) -> NewLedgerEntry {
    NewLedgerEntry {
        entry_date,
        channel,
        kind: LedgerKind::Expense,
        amount: Money::from_cents(cents),
        description: desc.to_string(),
    }
}

#[tokio::test]
async fn ledger_entries_shift_the_balance() {
    let engine = new_engine().await;
    let order = NewOrder::new(OrderId("d-1".into()), Channel::Delivery, Money::from_units(100))
        .with_payment(PaymentMethod::Cash, Money::from_units(100));
    engine.orders.process_new_order(order).await.unwrap();
    let oid = OrderId("d-1".into());
    for status in
        [OrderStatus::Preparing, OrderStatus::Ready, OrderStatus::OutForDelivery, OrderStatus::Delivered]
    {
        engine.orders.transition_order(&oid, status).await.unwrap();
    }
    engine.ledger.add_entry(expense(today(), Channel::Delivery, 2_000, "gas refill")).await.unwrap();
    engine
        .ledger
        .add_entry(NewLedgerEntry {
            entry_date: today(),
            channel: Channel::Delivery,
            kind: LedgerKind::Revenue,
            amount: Money::from_units(5),
            description: "bottle returns".into(),
        })
        .await
        .unwrap();
    let snapshot = engine.recon.read(today(), Channel::Delivery).await.unwrap();
    assert_eq!(snapshot.net_sales, Money::from_units(100));
    assert_eq!(snapshot.ledger_expense, Money::from_units(20));
    assert_eq!(snapshot.ledger_revenue, Money::from_units(5));
    assert_eq!(snapshot.balance, Money::from_units(85));
}

#[tokio::test]
async fn ledger_mutations_invalidate_the_cached_day() {
    let engine = new_engine().await;
    // Prime the cache with an empty day.
    let before = engine.recon.read(today(), Channel::DineIn).await.unwrap();
    assert_eq!(before.ledger_expense, Money::from_cents(0));
    let entry = engine.ledger.add_entry(expense(today(), Channel::DineIn, 1_500, "broken plates")).await.unwrap();
    let after_add = engine.recon.read(today(), Channel::DineIn).await.unwrap();
    assert_eq!(after_add.ledger_expense, Money::from_units(15));

    let updated = engine
        .ledger
        .update_entry(entry.id, expense(today(), Channel::DineIn, 2_500, "broken plates, recounted"))
        .await
        .unwrap();
    let after_update = engine.recon.read(today(), Channel::DineIn).await.unwrap();
    assert_eq!(after_update.ledger_expense, Money::from_units(25));

    engine.ledger.delete_entry(updated.id).await.unwrap();
    let after_delete = engine.recon.read(today(), Channel::DineIn).await.unwrap();
    assert_eq!(after_delete.ledger_expense, Money::from_cents(0));
}

#[tokio::test]
async fn moving_an_entry_invalidates_both_keys() {
    let engine = new_engine().await;
    let yesterday = today().pred_opt().unwrap();
    let entry = engine.ledger.add_entry(expense(yesterday, Channel::Delivery, 1_000, "flour")).await.unwrap();
    // Prime both days.
    assert_eq!(engine.recon.read(yesterday, Channel::Delivery).await.unwrap().ledger_expense, Money::from_units(10));
    assert_eq!(engine.recon.read(today(), Channel::Delivery).await.unwrap().ledger_expense, Money::from_cents(0));
    // Move the expense to today.
    engine.ledger.update_entry(entry.id, expense(today(), Channel::Delivery, 1_000, "flour")).await.unwrap();
    assert_eq!(engine.recon.read(yesterday, Channel::Delivery).await.unwrap().ledger_expense, Money::from_cents(0));
    assert_eq!(engine.recon.read(today(), Channel::Delivery).await.unwrap().ledger_expense, Money::from_units(10));
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let engine = new_engine().await;
    let err = engine.ledger.add_entry(expense(today(), Channel::Delivery, 0, "nothing")).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::AmountNotPositive(_)));
    let err = engine.ledger.add_entry(expense(today(), Channel::Delivery, -500, "negative")).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::AmountNotPositive(_)));
}

#[tokio::test]
async fn listing_filters_by_range_and_channel() {
    let engine = new_engine().await;
    let yesterday = today().pred_opt().unwrap();
    engine.ledger.add_entry(expense(yesterday, Channel::Delivery, 1_000, "flour")).await.unwrap();
    engine.ledger.add_entry(expense(today(), Channel::Delivery, 2_000, "gas refill")).await.unwrap();
    engine.ledger.add_entry(expense(today(), Channel::DineIn, 3_000, "linen service")).await.unwrap();

    let all_today = engine.ledger.entries(DateRange::single_day(today()), None).await.unwrap();
    assert_eq!(all_today.len(), 2);
    let delivery_today = engine.ledger.entries(DateRange::single_day(today()), Some(Channel::Delivery)).await.unwrap();
    assert_eq!(delivery_today.len(), 1);
    assert_eq!(delivery_today[0].description, "gas refill");
    let range = DateRange::new(yesterday, today()).unwrap();
    let everything = engine.ledger.entries(range, None).await.unwrap();
    assert_eq!(everything.len(), 3);
}

#[tokio::test]
async fn missing_entries_surface_not_found() {
    let engine = new_engine().await;
    let err = engine.ledger.delete_entry(999).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::LedgerEntryNotFound(999)));
    let err = engine.ledger.update_entry(999, expense(today(), Channel::Delivery, 100, "ghost")).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::LedgerEntryNotFound(999)));
}
