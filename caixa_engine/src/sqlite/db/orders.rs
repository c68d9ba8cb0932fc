use chrono::{FixedOffset, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Channel, DateRange, NewOrder, Order, OrderId, OrderStatus, PaymentAllocation},
    traits::ReconciliationError,
};

/// Inserts the order into the database, returning `false` in the second parameter if the order
/// already exists. The UNIQUE constraint on `order_id` arbitrates concurrent resubmissions: the
/// losing insert is a no-op and reads back the stored order instead of surfacing an error.
pub async fn idempotent_insert(order: NewOrder, conn: &mut SqliteConnection) -> Result<(Order, bool), ReconciliationError> {
    let oid = order.order_id.clone();
    match insert_order(order, conn).await? {
        Some(order) => {
            debug!("📝️ Order [{}] inserted with id {}", order.order_id, order.id);
            Ok((order, true))
        },
        None => {
            let existing = fetch_order_by_order_id(&oid, conn)
                .await?
                .ok_or_else(|| ReconciliationError::DatabaseError(format!("Order [{oid}] vanished after insert conflict")))?;
            Ok((existing, false))
        },
    }
}

/// Inserts a new order and its payment allocations using the given connection, returning `None`
/// if an order with the same `order_id` already exists. Not atomic on its own; embed the call in
/// a transaction and pass `&mut *tx` when atomicity matters.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Option<Order>, ReconciliationError> {
    let now = Utc::now();
    let inserted: Option<Order> = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                channel,
                status,
                gross_total,
                discount,
                delivery_fee,
                coupon_code,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (order_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(&order.order_id)
    .bind(order.channel)
    .bind(OrderStatus::Pending)
    .bind(order.gross_total)
    .bind(order.discount)
    .bind(order.delivery_fee)
    .bind(&order.coupon_code)
    .bind(order.created_at)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(mut inserted) = inserted else {
        return Ok(None);
    };
    for allocation in &order.payments {
        sqlx::query("INSERT INTO order_payments (order_id, method, amount) VALUES ($1, $2, $3)")
            .bind(inserted.id)
            .bind(allocation.method)
            .bind(allocation.amount)
            .execute(&mut *conn)
            .await?;
    }
    inserted.payments = order.payments;
    Ok(Some(inserted))
}

/// Returns the order for the given `order_id`, with its payment allocations attached.
pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(&mut *conn).await?;
    match order {
        Some(mut order) => {
            order.payments = fetch_payments(order.id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

async fn fetch_payments(order_row_id: i64, conn: &mut SqliteConnection) -> Result<Vec<PaymentAllocation>, sqlx::Error> {
    sqlx::query_as("SELECT method, amount FROM order_payments WHERE order_id = $1 ORDER BY id")
        .bind(order_row_id)
        .fetch_all(conn)
        .await
}

/// Writes the new status (and, for settled labels, the `settled_at` stamp) for an order.
/// Validation has already happened; this only performs the UPDATE.
pub async fn set_status(
    order_id: &OrderId,
    new_status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<(), ReconciliationError> {
    let now = Utc::now();
    let settled_at = new_status.is_settled().then_some(now);
    sqlx::query("UPDATE orders SET status = $1, settled_at = COALESCE($2, settled_at), updated_at = $3 WHERE order_id = $4")
        .bind(new_status)
        .bind(settled_at)
        .bind(now)
        .bind(order_id.as_str())
        .execute(conn)
        .await?;
    Ok(())
}

/// All settled orders for `channel` whose business settlement date falls in `range`, oldest
/// first. `settled_at` is stored as a UTC instant; `offset` shifts it onto the local calendar
/// before the date comparison, so a late-evening settlement stays on the local day.
pub async fn fetch_settled_orders(
    range: DateRange,
    channel: Channel,
    offset: FixedOffset,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, ReconciliationError> {
    let shift = format!("{} seconds", offset.local_minus_utc());
    let mut orders: Vec<Order> = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE channel = $1
              AND status IN ('delivered', 'closed_tab')
              AND date(settled_at, $2) BETWEEN $3 AND $4
            ORDER BY settled_at, id;
        "#,
    )
    .bind(channel)
    .bind(&shift)
    .bind(range.start)
    .bind(range.end)
    .fetch_all(&mut *conn)
    .await?;
    for order in &mut orders {
        order.payments = fetch_payments(order.id, conn).await?;
    }
    Ok(orders)
}
