use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{AggregateSnapshot, Channel, ClosingRecord, DateRange},
    traits::ReconciliationError,
};

/// Raw row shape; the frozen snapshot lives in a JSON column.
#[derive(FromRow)]
struct ClosingRow {
    id: i64,
    closing_date: NaiveDate,
    channel: Channel,
    closed_at: DateTime<Utc>,
    operator_note: Option<String>,
    snapshot: String,
}

impl TryFrom<ClosingRow> for ClosingRecord {
    type Error = ReconciliationError;

    fn try_from(row: ClosingRow) -> Result<Self, Self::Error> {
        let snapshot: AggregateSnapshot = serde_json::from_str(&row.snapshot)
            .map_err(|e| ReconciliationError::DatabaseError(format!("Corrupt frozen snapshot for closing {}: {e}", row.id)))?;
        Ok(ClosingRecord {
            id: row.id,
            date: row.closing_date,
            channel: row.channel,
            closed_at: row.closed_at,
            operator_note: row.operator_note,
            snapshot,
        })
    }
}

/// Inserts a closing record unless one already exists for the key. The UNIQUE constraint on
/// (closing_date, channel) makes this safe under concurrent close attempts: exactly one row ever
/// exists, and every caller gets it back. Returns `false` if the row already existed.
pub async fn idempotent_insert(
    date: NaiveDate,
    channel: Channel,
    operator_note: Option<String>,
    snapshot: &AggregateSnapshot,
    conn: &mut SqliteConnection,
) -> Result<(ClosingRecord, bool), ReconciliationError> {
    let frozen = serde_json::to_string(snapshot)
        .map_err(|e| ReconciliationError::DatabaseError(format!("Could not serialize snapshot: {e}")))?;
    let result = sqlx::query(
        r#"
            INSERT INTO register_closings (closing_date, channel, closed_at, operator_note, snapshot)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (closing_date, channel) DO NOTHING;
        "#,
    )
    .bind(date)
    .bind(channel)
    .bind(Utc::now())
    .bind(&operator_note)
    .bind(&frozen)
    .execute(&mut *conn)
    .await?;
    let inserted = result.rows_affected() == 1;
    if inserted {
        debug!("🔐️ Register closed for {date} {channel}");
    }
    let record = fetch_closing(date, channel, conn)
        .await?
        .ok_or_else(|| ReconciliationError::DatabaseError(format!("Closing for {date} {channel} vanished after insert")))?;
    Ok((record, inserted))
}

pub async fn fetch_closing(
    date: NaiveDate,
    channel: Channel,
    conn: &mut SqliteConnection,
) -> Result<Option<ClosingRecord>, ReconciliationError> {
    let row: Option<ClosingRow> =
        sqlx::query_as("SELECT * FROM register_closings WHERE closing_date = $1 AND channel = $2")
            .bind(date)
            .bind(channel)
            .fetch_optional(conn)
            .await?;
    row.map(ClosingRecord::try_from).transpose()
}

/// Closings in `range`, ordered by date then channel.
pub async fn fetch_closings(range: DateRange, conn: &mut SqliteConnection) -> Result<Vec<ClosingRecord>, ReconciliationError> {
    let rows: Vec<ClosingRow> = sqlx::query_as(
        "SELECT * FROM register_closings WHERE closing_date BETWEEN $1 AND $2 ORDER BY closing_date, channel",
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(conn)
    .await?;
    rows.into_iter().map(ClosingRecord::try_from).collect()
}
