use actix_web::http::StatusCode;
use chrono::Utc;
use serde_json::json;

use crate::endpoint_tests::helpers::{delete, get, post_json, prepare_test_db, put_json, test_service};

fn today() -> String {
    Utc::now().date_naive().to_string()
}

#[actix_web::test]
async fn ledger_crud_shows_up_in_the_summary() {
    let db = prepare_test_db().await;
    let service = test_service(db).await;
    let entry = json!({
        "entry_date": today(),
        "channel": "dine_in",
        "kind": "expense",
        "amount": "15.00",
        "description": "broken plates"
    });
    let (status, body) = post_json(&service, "/api/ledger", &entry).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: serde_json::Value = serde_json::from_str(&body).unwrap();
    let id = created["id"].as_i64().unwrap();

    let (_, body) = get(&service, &format!("/api/aggregate/{}/dine_in", today())).await;
    let snapshot: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(snapshot["ledger_expense"], "15.00");

    let updated = json!({
        "entry_date": today(),
        "channel": "dine_in",
        "kind": "expense",
        "amount": "25.00",
        "description": "broken plates, recounted"
    });
    let (status, _) = put_json(&service, &format!("/api/ledger/{id}"), &updated).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = get(&service, &format!("/api/aggregate/{}/dine_in", today())).await;
    let snapshot: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(snapshot["ledger_expense"], "25.00");

    let (status, _) = delete(&service, &format!("/api/ledger/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = get(&service, &format!("/api/aggregate/{}/dine_in", today())).await;
    let snapshot: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(snapshot["ledger_expense"], "0.00");
}

#[actix_web::test]
async fn listing_defaults_to_today_and_filters_by_channel() {
    let db = prepare_test_db().await;
    let service = test_service(db).await;
    for (channel, desc) in [("delivery", "gas refill"), ("dine_in", "linen service")] {
        let entry = json!({
            "entry_date": today(),
            "channel": channel,
            "kind": "expense",
            "amount": "10.00",
            "description": desc
        });
        let (status, _) = post_json(&service, "/api/ledger", &entry).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, body) = get(&service, "/api/ledger").await;
    assert_eq!(status, StatusCode::OK);
    let all: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, body) = get(&service, "/api/ledger?channel=delivery").await;
    assert_eq!(status, StatusCode::OK);
    let filtered: serde_json::Value = serde_json::from_str(&body).unwrap();
    let filtered = filtered.as_array().unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["description"], "gas refill");
}

#[actix_web::test]
async fn bad_ledger_payloads_are_rejected() {
    let db = prepare_test_db().await;
    let service = test_service(db).await;
    let entry = json!({
        "entry_date": today(),
        "channel": "dine_in",
        "kind": "expense",
        "amount": "0.00",
        "description": "nothing"
    });
    let (status, body) = post_json(&service, "/api/ledger", &entry).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("positive"));

    let (status, _) = delete(&service, "/api/ledger/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&service, "/api/ledger?from=2024-06-10&to=2024-06-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
