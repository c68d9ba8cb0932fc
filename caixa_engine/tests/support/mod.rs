use std::sync::Arc;

use caixa_engine::{
    cache::CacheLayer,
    events::EventProducers,
    LedgerApi,
    OrderFlowApi,
    ReconciliationApi,
    SqliteDatabase,
};
use chrono::{FixedOffset, Offset, Utc};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub fn random_db_path() -> String {
    format!("sqlite://{}/caixa_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

pub async fn prepare_test_db(url: &str, offset: FixedOffset) -> SqliteDatabase {
    let _ = env_logger::try_init();
    if let Err(e) = Sqlite::drop_database(url).await {
        debug!("Could not drop database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating test database");
    let db = SqliteDatabase::new_with_url(url, 5, offset).await.expect("Error connecting to test database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Test database ready at {url}");
    db
}

/// One fully wired engine over a throwaway database. Every test constructs its own, so cache
/// state never leaks between cases.
pub struct TestEngine {
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub ledger: LedgerApi<SqliteDatabase>,
    pub recon: ReconciliationApi<SqliteDatabase>,
}

pub async fn new_engine() -> TestEngine {
    new_engine_with_producers(EventProducers::default()).await
}

pub async fn new_engine_at_offset(offset: FixedOffset) -> TestEngine {
    let db = prepare_test_db(&random_db_path(), offset).await;
    wire_up(db, EventProducers::default())
}

pub async fn new_engine_with_producers(producers: EventProducers) -> TestEngine {
    let db = prepare_test_db(&random_db_path(), Utc.fix()).await;
    wire_up(db, producers)
}

fn wire_up(db: SqliteDatabase, producers: EventProducers) -> TestEngine {
    let cache = Arc::new(CacheLayer::new());
    TestEngine {
        orders: OrderFlowApi::new(db.clone(), Arc::clone(&cache), producers.clone()),
        ledger: LedgerApi::new(db.clone(), Arc::clone(&cache), producers.clone()),
        recon: ReconciliationApi::new(db, cache, producers),
    }
}
