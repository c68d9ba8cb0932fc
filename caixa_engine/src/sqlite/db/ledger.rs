use chrono::Utc;
use log::debug;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Channel, DateRange, LedgerEntry, NewLedgerEntry},
    traits::ReconciliationError,
};

pub async fn insert_entry(entry: NewLedgerEntry, conn: &mut SqliteConnection) -> Result<LedgerEntry, ReconciliationError> {
    if !entry.amount.is_positive() {
        return Err(ReconciliationError::AmountNotPositive(entry.amount));
    }
    let now = Utc::now();
    let inserted: LedgerEntry = sqlx::query_as(
        r#"
            INSERT INTO ledger_entries (channel, kind, amount, entry_date, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *;
        "#,
    )
    .bind(entry.channel)
    .bind(entry.kind)
    .bind(entry.amount)
    .bind(entry.entry_date)
    .bind(&entry.description)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("📒️ Ledger entry {} inserted ({} {} on {})", inserted.id, inserted.kind, inserted.amount, inserted.entry_date);
    Ok(inserted)
}

pub async fn fetch_entry(id: i64, conn: &mut SqliteConnection) -> Result<Option<LedgerEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ledger_entries WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// Replaces the mutable fields of an entry, returning the record before and after the update.
pub async fn update_entry(
    id: i64,
    entry: NewLedgerEntry,
    conn: &mut SqliteConnection,
) -> Result<(LedgerEntry, LedgerEntry), ReconciliationError> {
    if !entry.amount.is_positive() {
        return Err(ReconciliationError::AmountNotPositive(entry.amount));
    }
    let old = fetch_entry(id, &mut *conn).await?.ok_or(ReconciliationError::LedgerEntryNotFound(id))?;
    let new: LedgerEntry = sqlx::query_as(
        r#"
            UPDATE ledger_entries
            SET channel = $1, kind = $2, amount = $3, entry_date = $4, description = $5, updated_at = $6
            WHERE id = $7
            RETURNING *;
        "#,
    )
    .bind(entry.channel)
    .bind(entry.kind)
    .bind(entry.amount)
    .bind(entry.entry_date)
    .bind(&entry.description)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok((old, new))
}

pub async fn delete_entry(id: i64, conn: &mut SqliteConnection) -> Result<LedgerEntry, ReconciliationError> {
    let deleted: Option<LedgerEntry> =
        sqlx::query_as("DELETE FROM ledger_entries WHERE id = $1 RETURNING *;").bind(id).fetch_optional(conn).await?;
    deleted.ok_or(ReconciliationError::LedgerEntryNotFound(id))
}

/// Entries in `range`, optionally narrowed to one channel, newest date first.
pub async fn fetch_entries(
    range: DateRange,
    channel: Option<Channel>,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, ReconciliationError> {
    let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM ledger_entries WHERE entry_date BETWEEN ");
    query.push_bind(range.start);
    query.push(" AND ");
    query.push_bind(range.end);
    if let Some(channel) = channel {
        query.push(" AND channel = ");
        query.push_bind(channel);
    }
    query.push(" ORDER BY entry_date DESC, id DESC");
    let entries = query.build_query_as().fetch_all(conn).await?;
    Ok(entries)
}
