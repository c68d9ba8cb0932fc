use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use caixa_engine::{cache::CacheLayer, events::EventProducers, LedgerApi, OrderFlowApi, ReconciliationApi, SqliteDatabase};
use log::info;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        AddLedgerEntryRoute,
        AggregateForChannelRoute,
        CloseRegisterRoute,
        ClosingHistoryRoute,
        DailySummaryRoute,
        DeleteLedgerEntryRoute,
        LedgerEntriesRoute,
        NewOrderRoute,
        OrderByIdRoute,
        UpdateLedgerEntryRoute,
        UpdateOrderStatusRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_db_connections, config.utc_offset)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.migrate_on_startup {
        info!("🚀️ Applying pending database migrations");
        db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let srv = create_server_instance(config, db, EventProducers::default())?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Builds the actix server. The three engine APIs share a single [`CacheLayer`] so that a
/// mutation through one API invalidates the aggregates another serves.
pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let cache = Arc::new(CacheLayer::default());
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), Arc::clone(&cache), producers.clone());
        let ledger_api = LedgerApi::new(db.clone(), Arc::clone(&cache), producers.clone());
        let recon_api = ReconciliationApi::new(db.clone(), Arc::clone(&cache), producers.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("caixa::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(ledger_api))
            .app_data(web::Data::new(recon_api));
        let api_scope = web::scope("/api")
            .service(DailySummaryRoute::<SqliteDatabase>::new())
            .service(AggregateForChannelRoute::<SqliteDatabase>::new())
            .service(CloseRegisterRoute::<SqliteDatabase>::new())
            .service(ClosingHistoryRoute::<SqliteDatabase>::new())
            .service(NewOrderRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(AddLedgerEntryRoute::<SqliteDatabase>::new())
            .service(UpdateLedgerEntryRoute::<SqliteDatabase>::new())
            .service(LedgerEntriesRoute::<SqliteDatabase>::new())
            .service(DeleteLedgerEntryRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
