use actix_web::http::StatusCode;
use serde_json::json;

use crate::endpoint_tests::helpers::{get, post_json, prepare_test_db, test_service};

#[actix_web::test]
async fn health_check() {
    let db = prepare_test_db().await;
    let service = test_service(db).await;
    let (status, body) = get(&service, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn submit_fetch_and_settle_an_order() {
    let db = prepare_test_db().await;
    let service = test_service(db).await;
    let order = json!({
        "order_id": "web-1001",
        "channel": "delivery",
        "gross_total": "50.00",
        "delivery_fee": "8.00",
        "payments": [{ "method": "pix", "amount": "58.00" }]
    });
    let (status, _) = post_json(&service, "/api/orders", &order).await;
    assert_eq!(status, StatusCode::CREATED);
    // A retry with the same order id is answered from the stored row.
    let (status, _) = post_json(&service, "/api/orders", &order).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&service, "/api/orders/web-1001").await;
    assert_eq!(status, StatusCode::OK);
    let fetched: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(fetched["status"], "pending");
    assert_eq!(fetched["gross_total"], "50.00");

    for step in ["preparing", "ready", "out_for_delivery", "delivered"] {
        let (status, _) = post_json(&service, "/api/orders/web-1001/status", &json!({ "status": step })).await;
        assert_eq!(status, StatusCode::OK, "transition to {step} failed");
    }
    let (_, body) = get(&service, "/api/orders/web-1001").await;
    let settled: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(settled["status"], "delivered");
    assert!(!settled["settled_at"].is_null());
}

#[actix_web::test]
async fn unknown_orders_get_404() {
    let db = prepare_test_db().await;
    let service = test_service(db).await;
    let (status, body) = get(&service, "/api/orders/no-such-order").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("does not exist"));
}

#[actix_web::test]
async fn illegal_transitions_get_400() {
    let db = prepare_test_db().await;
    let service = test_service(db).await;
    let order = json!({
        "order_id": "m-1",
        "channel": "dine_in",
        "gross_total": "20.00",
        "payments": [{ "method": "cash", "amount": "20.00" }]
    });
    let (status, _) = post_json(&service, "/api/orders", &order).await;
    assert_eq!(status, StatusCode::CREATED);
    // A dine-in order can never go out for delivery.
    let (status, body) =
        post_json(&service, "/api/orders/m-1/status", &json!({ "status": "out_for_delivery" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("error"));
}

#[actix_web::test]
async fn unbalanced_settlement_gets_400() {
    let db = prepare_test_db().await;
    let service = test_service(db).await;
    let order = json!({
        "order_id": "short-1",
        "channel": "dine_in",
        "gross_total": "20.00",
        "payments": [{ "method": "cash", "amount": "15.00" }]
    });
    post_json(&service, "/api/orders", &order).await;
    for step in ["preparing", "ready"] {
        post_json(&service, "/api/orders/short-1/status", &json!({ "status": step })).await;
    }
    let (status, body) = post_json(&service, "/api/orders/short-1/status", &json!({ "status": "closed_tab" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("allocations"));
}
