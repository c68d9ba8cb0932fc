use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use caixa_common::Money;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------    Business day    ----------------------------------------------------------
/// The current business date for a register whose day ticks over at `offset` from UTC.
///
/// Timestamps are stored as UTC instants; only date attribution shifts with the offset. A
/// restaurant west of Greenwich settling orders late in the evening books them on the local
/// calendar day, not the UTC day that has already rolled over.
pub fn business_today(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

//--------------------------------------      Channel       ----------------------------------------------------------
/// The sales channel an order belongs to. Channels have different fee structures (only delivery
/// carries a delivery fee) and are closed independently, so they are never merged in aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Delivery,
    DineIn,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Delivery, Channel::DineIn];
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Delivery => write!(f, "delivery"),
            Channel::DineIn => write!(f, "dine_in"),
        }
    }
}

impl FromStr for Channel {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(Self::Delivery),
            "dine_in" => Ok(Self::DineIn),
            s => Err(ConversionError(format!("Invalid channel: {s}"))),
        }
    }
}

//--------------------------------------   PaymentMethod    ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Pix,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Pix => write!(f, "pix"),
        }
    }
}

//--------------------------------------    OrderStatus     ----------------------------------------------------------
/// The order lifecycle. Transitions are one-directional and no state is revisited:
///
/// `Pending → Preparing → Ready → OutForDelivery (delivery only) → Delivered`, with dine-in
/// settling directly from `Ready` into `ClosedTab`, and `Cancelled` reachable from any
/// non-settled state.
///
/// `Delivered` and `ClosedTab` are the two settled terminal labels; both count toward sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    OutForDelivery,
    /// Settled terminal state for the delivery channel.
    Delivered,
    /// Settled terminal state for the dine-in channel (the tab was closed / order picked up).
    ClosedTab,
    /// Terminal, non-settled. Cancelled orders never count toward sales.
    Cancelled,
}

impl OrderStatus {
    /// True for the terminal labels that count toward sales.
    pub fn is_settled(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::ClosedTab)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_settled() || *self == OrderStatus::Cancelled
    }

    /// Whether `self → new_status` is a legal transition for an order on `channel`.
    pub fn can_transition_to(&self, new_status: OrderStatus, channel: Channel) -> bool {
        use OrderStatus::*;
        match (*self, new_status) {
            // Cancellation is allowed from any non-terminal state.
            (from, Cancelled) => !from.is_terminal(),
            (Pending, Preparing) => true,
            (Preparing, Ready) => true,
            (Ready, OutForDelivery) => channel == Channel::Delivery,
            (OutForDelivery, Delivered) => channel == Channel::Delivery,
            (Ready, ClosedTab) => channel == Channel::DineIn,
            (_, _) => false,
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Preparing => write!(f, "preparing"),
            OrderStatus::Ready => write!(f, "ready"),
            OrderStatus::OutForDelivery => write!(f, "out_for_delivery"),
            OrderStatus::Delivered => write!(f, "delivered"),
            OrderStatus::ClosedTab => write!(f, "closed_tab"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "preparing" => Ok(Self::Preparing),
            "ready" => Ok(Self::Ready),
            "out_for_delivery" => Ok(Self::OutForDelivery),
            "delivered" => Ok(Self::Delivered),
            "closed_tab" => Ok(Self::ClosedTab),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------      OrderId       ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------  PaymentAllocation ----------------------------------------------------------
/// One slice of an order's payment. An order may be paid with several methods (e.g. half cash,
/// half card); each slice feeds its own bucket in the aggregate breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentAllocation {
    pub method: PaymentMethod,
    pub amount: Money,
}

impl PaymentAllocation {
    pub fn new(method: PaymentMethod, amount: Money) -> Self {
        Self { method, amount }
    }
}

//--------------------------------------       Order        ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub channel: Channel,
    pub status: OrderStatus,
    pub gross_total: Money,
    pub discount: Money,
    pub delivery_fee: Money,
    pub coupon_code: Option<String>,
    /// Loaded from the `order_payments` table after the row itself.
    #[sqlx(skip)]
    pub payments: Vec<PaymentAllocation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Stamped when the order reaches a settled terminal status.
    pub settled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// The amount the payment allocations must cover: gross − discount + delivery fee.
    pub fn settled_total(&self) -> Money {
        self.gross_total - self.discount + self.delivery_fee
    }

    pub fn payments_total(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// Whether the payment allocations cover the settled total within [`caixa_common::MONEY_TOLERANCE`].
    pub fn payments_balance(&self) -> bool {
        self.payments_total().approx_eq(self.settled_total())
    }

    /// The business date this order settles on, if it has settled. `offset` defines where the
    /// business day boundary sits relative to UTC.
    pub fn settled_date(&self, offset: FixedOffset) -> Option<NaiveDate> {
        self.settled_at.map(|ts| ts.with_timezone(&offset).date_naive())
    }
}

//--------------------------------------      NewOrder      ----------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub channel: Channel,
    pub gross_total: Money,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub delivery_fee: Money,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub payments: Vec<PaymentAllocation>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(order_id: OrderId, channel: Channel, gross_total: Money) -> Self {
        Self {
            order_id,
            channel,
            gross_total,
            discount: Money::default(),
            delivery_fee: Money::default(),
            coupon_code: None,
            payments: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_delivery_fee(mut self, fee: Money) -> Self {
        self.delivery_fee = fee;
        self
    }

    pub fn with_payment(mut self, method: PaymentMethod, amount: Money) -> Self {
        self.payments.push(PaymentAllocation::new(method, amount));
        self
    }
}

//--------------------------------------     LedgerKind     ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Expense,
    Revenue,
}

impl Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerKind::Expense => write!(f, "expense"),
            LedgerKind::Revenue => write!(f, "revenue"),
        }
    }
}

//--------------------------------------    LedgerEntry     ----------------------------------------------------------
/// An ad-hoc expense or revenue entry not tied to an order, e.g. a manual cash adjustment.
/// Corrections to already-closed days are made with new entries dated appropriately, never by
/// reopening the closing.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub channel: Channel,
    pub kind: LedgerKind,
    pub amount: Money,
    pub entry_date: NaiveDate,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLedgerEntry {
    pub channel: Channel,
    pub kind: LedgerKind,
    pub amount: Money,
    pub entry_date: NaiveDate,
    pub description: String,
}

//--------------------------------------     DateRange      ----------------------------------------------------------
/// An inclusive date range. `start` must not be after `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

//--------------------------------------    MethodTotal     ----------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodTotal {
    pub count: i64,
    pub amount: Money,
}

//-------------------------------------- AggregateSnapshot  ----------------------------------------------------------
/// The reduction of one (date, channel) key's settled orders and ledger entries. Derived data:
/// recomputable at any time from the stores, never hand-edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub date: NaiveDate,
    pub channel: Channel,
    pub order_count: i64,
    pub gross_sales: Money,
    pub discounts: Money,
    /// gross_sales − discounts. Delivery fees are tracked on their own line and never folded in,
    /// so the two channels stay comparable.
    pub net_sales: Money,
    pub delivery_fees: Money,
    pub payment_breakdown: BTreeMap<PaymentMethod, MethodTotal>,
    pub ledger_revenue: Money,
    pub ledger_expense: Money,
    /// net_sales + ledger_revenue − ledger_expense.
    pub balance: Money,
}

impl AggregateSnapshot {
    /// A day with no orders is valid, not an error; reads of untouched days return this.
    pub fn empty(date: NaiveDate, channel: Channel) -> Self {
        Self {
            date,
            channel,
            order_count: 0,
            gross_sales: Money::default(),
            discounts: Money::default(),
            net_sales: Money::default(),
            delivery_fees: Money::default(),
            payment_breakdown: BTreeMap::new(),
            ledger_revenue: Money::default(),
            ledger_expense: Money::default(),
            balance: Money::default(),
        }
    }

    /// Sum of all payment-method buckets. Equals net_sales + delivery_fees within tolerance for
    /// any snapshot built from orders satisfying the allocation invariant.
    pub fn breakdown_total(&self) -> Money {
        self.payment_breakdown.values().map(|t| t.amount).sum()
    }
}

//--------------------------------------   ClosingRecord    ----------------------------------------------------------
/// The per-(date, channel) record of a closed register. At most one exists per key; once written
/// its frozen snapshot is immutable and is the only value ever served for that key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub channel: Channel,
    pub closed_at: DateTime<Utc>,
    pub operator_note: Option<String>,
    pub snapshot: AggregateSnapshot,
}

//--------------------------------------    DailySummary    ----------------------------------------------------------
/// Both channels of one business day, side by side. Channels are never summed into one figure
/// because their fee structures differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub delivery: AggregateSnapshot,
    pub dine_in: AggregateSnapshot,
}
