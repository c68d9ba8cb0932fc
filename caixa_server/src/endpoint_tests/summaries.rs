use actix_web::http::StatusCode;
use chrono::Utc;
use serde_json::json;

use crate::endpoint_tests::helpers::{get, post_json, prepare_test_db, test_service};

fn today() -> String {
    Utc::now().date_naive().to_string()
}

async fn settle_delivery_order<S>(service: &S, id: &str, gross: &str, method: &str)
where S: actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    > {
    let order = json!({
        "order_id": id,
        "channel": "delivery",
        "gross_total": gross,
        "payments": [{ "method": method, "amount": gross }]
    });
    let (status, _) = post_json(service, "/api/orders", &order).await;
    assert_eq!(status, StatusCode::CREATED);
    for step in ["preparing", "ready", "out_for_delivery", "delivered"] {
        let path = format!("/api/orders/{id}/status");
        let (status, _) = post_json(service, &path, &json!({ "status": step })).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[actix_web::test]
async fn summary_reflects_settled_orders() {
    let db = prepare_test_db().await;
    let service = test_service(db).await;
    settle_delivery_order(&service, "d-1", "50.00", "cash").await;
    settle_delivery_order(&service, "d-2", "30.00", "card").await;

    let (status, body) = get(&service, &format!("/api/summary/{}", today())).await;
    assert_eq!(status, StatusCode::OK);
    let summary: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(summary["delivery"]["order_count"], 2);
    assert_eq!(summary["delivery"]["gross_sales"], "80.00");
    assert_eq!(summary["dine_in"]["order_count"], 0);

    let (status, body) = get(&service, &format!("/api/aggregate/{}/delivery", today())).await;
    assert_eq!(status, StatusCode::OK);
    let snapshot: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(snapshot["payment_breakdown"]["cash"]["amount"], "50.00");
    assert_eq!(snapshot["payment_breakdown"]["card"]["amount"], "30.00");
}

#[actix_web::test]
async fn closing_freezes_the_served_summary() {
    let db = prepare_test_db().await;
    let service = test_service(db).await;
    settle_delivery_order(&service, "d-1", "50.00", "cash").await;

    let close = json!({ "date": today(), "channel": "delivery", "note": "end of shift" });
    let (status, body) = post_json(&service, "/api/close", &close).await;
    assert_eq!(status, StatusCode::OK);
    let record: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(record["snapshot"]["order_count"], 1);

    // A retry returns the same record.
    let (status, body) = post_json(&service, "/api/close", &close).await;
    assert_eq!(status, StatusCode::OK);
    let retry: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(retry["id"], record["id"]);

    settle_delivery_order(&service, "d-late", "10.00", "pix").await;
    let (_, body) = get(&service, &format!("/api/aggregate/{}/delivery", today())).await;
    let snapshot: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(snapshot["order_count"], 1, "a closed register serves its frozen snapshot");

    let (status, body) = get(&service, "/api/closings").await;
    assert_eq!(status, StatusCode::OK);
    let history: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn closing_the_future_gets_400() {
    let db = prepare_test_db().await;
    let service = test_service(db).await;
    let tomorrow = Utc::now().date_naive().succ_opt().unwrap();
    let close = json!({ "date": tomorrow.to_string(), "channel": "delivery" });
    let (status, body) = post_json(&service, "/api/close", &close).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("future"));
}
