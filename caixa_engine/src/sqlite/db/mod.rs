//! # SQLite database methods
//!
//! "Low-level" SQLite interactions, kept as simple functions (rather than stateful structs) that
//! accept a `&mut SqliteConnection` argument. Callers obtain a connection from a pool, or open a
//! transaction and pass `&mut *tx`, so atomicity is decided at the call site.
use std::env;

use chrono::{FixedOffset, Offset, Utc};
use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod closings;
pub mod ledger;
pub mod orders;

const SQLITE_DB_URL: &str = "sqlite://data/caixa.db";

pub fn db_url() -> String {
    let result = env::var("CAIXA_DATABASE_URL").unwrap_or_else(|_| {
        info!("CAIXA_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

/// Reads the business-day offset from `CAIXA_UTC_OFFSET` (e.g. `-03:00`), defaulting to UTC.
pub fn utc_offset() -> FixedOffset {
    let result = env::var("CAIXA_UTC_OFFSET")
        .ok()
        .and_then(|s| {
            s.parse::<FixedOffset>()
                .map_err(|e| info!("{s} is not a valid value for CAIXA_UTC_OFFSET ({e}). Using UTC."))
                .ok()
        })
        .unwrap_or_else(|| Utc.fix());
    info!("Business days tick over at UTC{result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
