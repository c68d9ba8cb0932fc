//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are async and non-blocking: every store or engine call is awaited, so worker threads
//! keep serving other requests while SQLite does its thing.
use actix_web::{get, web, HttpResponse, Responder};
use caixa_engine::{
    db_types::{business_today, Channel, DateRange, NewLedgerEntry, NewOrder, OrderId},
    traits::ReconciliationDatabase,
    LedgerApi,
    OrderFlowApi,
    ReconciliationApi,
    ReconciliationError,
};
use chrono::{FixedOffset, NaiveDate};
use log::*;

use crate::{
    data_objects::{CloseParams, RangeQuery, StatusUpdate},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

/// Missing bounds default to the current business day at the store's configured UTC offset.
fn range_from_query(query: &RangeQuery, offset: FixedOffset) -> Result<DateRange, ServerError> {
    let today = business_today(offset);
    let start = query.from.unwrap_or(today);
    let end = query.to.unwrap_or(today);
    DateRange::new(start, end).ok_or(ServerError::ReconciliationError(ReconciliationError::InvalidDateRange))
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Summaries  ----------------------------------------------------
route!(daily_summary => Get "/summary/{date}" impl ReconciliationDatabase);
/// Both channels of one business day side by side. Each channel independently serves its frozen
/// snapshot if closed, or a live aggregate if still open.
pub async fn daily_summary<B: ReconciliationDatabase>(
    path: web::Path<NaiveDate>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let date = path.into_inner();
    debug!("💻️ GET summary for {date}");
    let summary = api.daily_summary(date).await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(aggregate_for_channel => Get "/aggregate/{date}/{channel}" impl ReconciliationDatabase);
pub async fn aggregate_for_channel<B: ReconciliationDatabase>(
    path: web::Path<(NaiveDate, Channel)>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (date, channel) = path.into_inner();
    debug!("💻️ GET aggregate for {date} {channel}");
    let snapshot = api.read(date, channel).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

//----------------------------------------------   Closings  ----------------------------------------------------
route!(close_register => Post "/close" impl ReconciliationDatabase);
/// Closes the register for a (date, channel) key, freezing its snapshot. Idempotent: repeating
/// the call returns the already-persisted record.
pub async fn close_register<B: ReconciliationDatabase>(
    body: web::Json<CloseParams>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST close register for {} {}", params.date, params.channel);
    let record = api.close(params.date, params.channel, params.note).await?;
    Ok(HttpResponse::Ok().json(record))
}

route!(closing_history => Get "/closings" impl ReconciliationDatabase);
pub async fn closing_history<B: ReconciliationDatabase>(
    query: web::Query<RangeQuery>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let range = range_from_query(&query, api.db().business_offset())?;
    debug!("💻️ GET closing history for {} to {}", range.start, range.end);
    let history = api.closing_history(range).await?;
    Ok(HttpResponse::Ok().json(history))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(new_order => Post "/orders" impl ReconciliationDatabase);
/// Registers a new order. Re-submitting an order id is idempotent and returns the stored order.
pub async fn new_order<B: ReconciliationDatabase>(
    body: web::Json<NewOrder>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order = body.into_inner();
    debug!("💻️ POST new order {} on the {} channel", order.order_id, order.channel);
    let (order, inserted) = api.process_new_order(order).await?;
    let response = if inserted { HttpResponse::Created().json(order) } else { HttpResponse::Ok().json(order) };
    Ok(response)
}

route!(order_by_id => Get "/orders/{order_id}" impl ReconciliationDatabase);
pub async fn order_by_id<B: ReconciliationDatabase>(
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order {order_id}");
    let order = api
        .order_by_id(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Post "/orders/{order_id}/status" impl ReconciliationDatabase);
pub async fn update_order_status<B: ReconciliationDatabase>(
    path: web::Path<OrderId>,
    body: web::Json<StatusUpdate>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let new_status = body.into_inner().status;
    debug!("💻️ POST status {new_status} for order {order_id}");
    let order = api.transition_order(&order_id, new_status).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Ledger  ----------------------------------------------------
route!(add_ledger_entry => Post "/ledger" impl ReconciliationDatabase);
pub async fn add_ledger_entry<B: ReconciliationDatabase>(
    body: web::Json<NewLedgerEntry>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let entry = body.into_inner();
    debug!("💻️ POST ledger {} of {} on {}", entry.kind, entry.amount, entry.entry_date);
    let entry = api.add_entry(entry).await?;
    Ok(HttpResponse::Created().json(entry))
}

route!(update_ledger_entry => Put "/ledger/{id}" impl ReconciliationDatabase);
pub async fn update_ledger_entry<B: ReconciliationDatabase>(
    path: web::Path<i64>,
    body: web::Json<NewLedgerEntry>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PUT ledger entry {id}");
    let entry = api.update_entry(id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entry))
}

route!(delete_ledger_entry => Delete "/ledger/{id}" impl ReconciliationDatabase);
pub async fn delete_ledger_entry<B: ReconciliationDatabase>(
    path: web::Path<i64>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ DELETE ledger entry {id}");
    let entry = api.delete_entry(id).await?;
    Ok(HttpResponse::Ok().json(entry))
}

route!(ledger_entries => Get "/ledger" impl ReconciliationDatabase);
pub async fn ledger_entries<B: ReconciliationDatabase>(
    query: web::Query<RangeQuery>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let range = range_from_query(&query, api.db().business_offset())?;
    debug!("💻️ GET ledger entries for {} to {}", range.start, range.end);
    let entries = api.entries(range, query.channel).await?;
    Ok(HttpResponse::Ok().json(entries))
}
