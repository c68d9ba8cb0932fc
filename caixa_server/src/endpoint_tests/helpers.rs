use std::sync::Arc;

use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    App,
};
use caixa_engine::{
    cache::CacheLayer,
    events::EventProducers,
    LedgerApi,
    OrderFlowApi,
    ReconciliationApi,
    SqliteDatabase,
};
use chrono::{Offset, Utc};
use log::*;
use serde::Serialize;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::routes::{
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
};

pub async fn prepare_test_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let url = format!("sqlite://{}/caixa_server_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>());
    if let Err(e) = Sqlite::drop_database(&url).await {
        debug!("Could not drop database {url}: {e:?}");
    }
    Sqlite::create_database(&url).await.expect("Error creating test database");
    let db = SqliteDatabase::new_with_url(&url, 5, Utc.fix()).await.expect("Error connecting to test database");
    db.migrate().await.expect("Error running DB migrations");
    db
}

/// Initialises the full route tree over a throwaway database, mirroring the production app
/// layout in `server.rs`.
pub async fn test_service(
    db: SqliteDatabase,
) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    let cache = Arc::new(CacheLayer::default());
    let producers = EventProducers::default();
    let orders_api = OrderFlowApi::new(db.clone(), Arc::clone(&cache), producers.clone());
    let ledger_api = LedgerApi::new(db.clone(), Arc::clone(&cache), producers.clone());
    let recon_api = ReconciliationApi::new(db, cache, producers);
    let app = App::new()
        .app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(ledger_api))
        .app_data(web::Data::new(recon_api))
        .service(health)
        .service(
            web::scope("/api")
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
                .service(DeleteLedgerEntryRoute::<SqliteDatabase>::new()),
        );
    test::init_service(app).await
}

pub async fn get<S>(service: &S, path: &str) -> (StatusCode, String)
where S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    let req = TestRequest::get().uri(path).to_request();
    call(service, req).await
}

pub async fn post_json<S, B: Serialize>(service: &S, path: &str, body: &B) -> (StatusCode, String)
where S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    let req = TestRequest::post().uri(path).set_json(body).to_request();
    call(service, req).await
}

pub async fn put_json<S, B: Serialize>(service: &S, path: &str, body: &B) -> (StatusCode, String)
where S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    let req = TestRequest::put().uri(path).set_json(body).to_request();
    call(service, req).await
}

pub async fn delete<S>(service: &S, path: &str) -> (StatusCode, String)
where S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    let req = TestRequest::delete().uri(path).to_request();
    call(service, req).await
}

async fn call<S>(service: &S, req: actix_http::Request) -> (StatusCode, String)
where S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    let (_, res) = test::call_service(service, req).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}
