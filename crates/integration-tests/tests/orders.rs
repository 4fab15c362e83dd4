//! Integration tests for order placement and cancellation.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p tiffinbox-server)
//! - Seeded menu items and a verified address for the test user
//!
//! Run with: cargo test -p tiffinbox-integration-tests -- --ignored

use chrono::{Duration, Local};
use reqwest::StatusCode;
use serde_json::{Value, json};

use tiffinbox_integration_tests::{admin_client, base_url, client_for_user};

const TEST_USER: i32 = 1;
const TEST_ADDRESS: i32 = 1;
const TEST_MENU_ITEM: i32 = 1;

/// A date safely inside the ordering window and past any same-day cutoff.
fn tomorrow() -> String {
    (Local::now().date_naive() + Duration::days(1)).to_string()
}

fn order_body(date: &str) -> Value {
    json!({
        "order_date": date,
        "meal_type": "lunch",
        "items": [{ "menu_item_id": TEST_MENU_ITEM, "quantity": 1 }],
        "address_id": TEST_ADDRESS,
    })
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_place_and_fetch_order() {
    let client = client_for_user(TEST_USER);
    let base = base_url();

    let resp = client
        .post(format!("{base}/orders"))
        .json(&order_body(&tomorrow()))
        .send()
        .await
        .expect("place order");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["success"], true);
    let order_id = body["order"]["id"].as_i64().expect("order id");
    let order_number = body["order"]["order_number"].as_str().expect("number");
    assert!(order_number.starts_with("ORD-"));

    let resp = client
        .get(format!("{base}/orders/{order_id}"))
        .send()
        .await
        .expect("fetch order");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["order"]["status"], "pending");
    assert_eq!(body["order"]["payment_status"], "pending");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_place_order_rejects_past_date() {
    let client = client_for_user(TEST_USER);
    let yesterday = (Local::now().date_naive() - Duration::days(1)).to_string();

    let resp = client
        .post(format!("{}/orders", base_url()))
        .json(&order_body(&yesterday))
        .send()
        .await
        .expect("place order");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_cancel_releases_capacity() {
    let client = client_for_user(TEST_USER);
    let base = base_url();
    let date = tomorrow();

    let resp = client
        .post(format!("{base}/orders"))
        .json(&order_body(&date))
        .send()
        .await
        .expect("place order");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("json body");
    let order_id = body["order"]["id"].as_i64().expect("order id");

    let before: Value = client
        .get(format!("{base}/capacity/date/{date}"))
        .send()
        .await
        .expect("capacity")
        .json()
        .await
        .expect("json body");
    let booked_before = before["capacity"]["lunch"]["booked"]
        .as_i64()
        .expect("booked");

    let resp = client
        .post(format!("{base}/orders/{order_id}/cancel"))
        .json(&json!({ "reason": "integration test" }))
        .send()
        .await
        .expect("cancel order");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["order"]["status"], "cancelled");

    let after: Value = client
        .get(format!("{base}/capacity/date/{date}"))
        .send()
        .await
        .expect("capacity")
        .json()
        .await
        .expect("json body");
    let booked_after = after["capacity"]["lunch"]["booked"]
        .as_i64()
        .expect("booked");

    assert_eq!(booked_after, booked_before - 1);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_cancel_twice_fails() {
    let client = client_for_user(TEST_USER);
    let base = base_url();

    let resp = client
        .post(format!("{base}/orders"))
        .json(&order_body(&tomorrow()))
        .send()
        .await
        .expect("place order");
    let body: Value = resp.json().await.expect("json body");
    let order_id = body["order"]["id"].as_i64().expect("order id");

    let first = client
        .post(format!("{base}/orders/{order_id}/cancel"))
        .json(&json!({}))
        .send()
        .await
        .expect("first cancel");
    assert_eq!(first.status(), StatusCode::OK);

    let second = client
        .post(format!("{base}/orders/{order_id}/cancel"))
        .json(&json!({}))
        .send()
        .await
        .expect("second cancel");
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_bulk_checkout_reports_partial_failures() {
    let client = client_for_user(TEST_USER);
    let date = tomorrow();

    // Group 2 has an empty item list and must fail without aborting its
    // siblings
    let resp = client
        .post(format!("{}/orders/bulk", base_url()))
        .json(&json!({
            "orders": [
                {
                    "order_date": date,
                    "meal_type": "breakfast",
                    "items": [{ "menu_item_id": TEST_MENU_ITEM, "quantity": 1 }],
                    "address_id": TEST_ADDRESS,
                },
                {
                    "order_date": date,
                    "meal_type": "lunch",
                    "items": [],
                    "address_id": TEST_ADDRESS,
                },
                {
                    "order_date": date,
                    "meal_type": "dinner",
                    "items": [{ "menu_item_id": TEST_MENU_ITEM, "quantity": 2 }],
                    "address_id": TEST_ADDRESS,
                },
            ]
        }))
        .send()
        .await
        .expect("bulk checkout");

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["success"], true);
    assert_eq!(body["orders"].as_array().expect("orders").len(), 2);
    assert_eq!(body["errors"].as_array().expect("errors").len(), 1);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_bulk_checkout_skips_sold_out_group() {
    let client = client_for_user(TEST_USER);
    let admin = admin_client(99);
    let base = base_url();
    // A far-out date so no earlier test has booked this slot
    let date = (Local::now().date_naive() + Duration::days(6)).to_string();

    // Exhaust lunch for the date
    let resp = admin
        .post(format!("{base}/capacity"))
        .json(&json!({ "date": date, "lunch_capacity": 0 }))
        .send()
        .await
        .expect("set capacity");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{base}/orders/bulk"))
        .json(&json!({
            "orders": [
                {
                    "order_date": date,
                    "meal_type": "breakfast",
                    "items": [{ "menu_item_id": TEST_MENU_ITEM, "quantity": 1 }],
                    "address_id": TEST_ADDRESS,
                },
                {
                    "order_date": date,
                    "meal_type": "lunch",
                    "items": [{ "menu_item_id": TEST_MENU_ITEM, "quantity": 1 }],
                    "address_id": TEST_ADDRESS,
                },
                {
                    "order_date": date,
                    "meal_type": "dinner",
                    "items": [{ "menu_item_id": TEST_MENU_ITEM, "quantity": 1 }],
                    "address_id": TEST_ADDRESS,
                },
            ]
        }))
        .send()
        .await
        .expect("bulk checkout");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["orders"].as_array().expect("orders").len(), 2);
    assert_eq!(body["errors"].as_array().expect("errors").len(), 1);

    // The sold-out group reserved nothing; the siblings each hold one slot
    let capacity: Value = client
        .get(format!("{base}/capacity/date/{date}"))
        .send()
        .await
        .expect("capacity")
        .json()
        .await
        .expect("json body");
    assert_eq!(capacity["capacity"]["lunch"]["booked"], 0);
    assert_eq!(capacity["capacity"]["breakfast"]["booked"], 1);
    assert_eq!(capacity["capacity"]["dinner"]["booked"], 1);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_order_history_filters() {
    let client = client_for_user(TEST_USER);

    let resp = client
        .get(format!(
            "{}/orders?status=cancelled&meal_type=lunch&limit=5",
            base_url()
        ))
        .send()
        .await
        .expect("history");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("json body");
    for order in body["orders"].as_array().expect("orders") {
        assert_eq!(order["status"], "cancelled");
        assert_eq!(order["meal_type"], "lunch");
    }
}
