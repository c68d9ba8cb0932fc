use caixa_engine::db_types::{Channel, OrderStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Body for `POST /api/close`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseParams {
    pub date: NaiveDate,
    pub channel: Channel,
    #[serde(default)]
    pub note: Option<String>,
}

/// Body for `POST /api/orders/{order_id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// Query parameters accepted by the history-style endpoints. Both dates default to today when
/// omitted, so `GET /api/ledger` with no parameters lists today's entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeQuery {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub channel: Option<Channel>,
}
