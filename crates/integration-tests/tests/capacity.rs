//! Integration tests for the capacity ledger endpoints.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p tiffinbox-server)
//!
//! Run with: cargo test -p tiffinbox-integration-tests -- --ignored

use chrono::{Duration, Local};
use reqwest::StatusCode;
use serde_json::{Value, json};

use tiffinbox_integration_tests::{admin_client, base_url, client_for_user};

const TEST_USER: i32 = 1;
const TEST_ADMIN: i32 = 99;

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_next_seven_days_reports_all_three_numbers() {
    let client = client_for_user(TEST_USER);

    let resp = client
        .get(format!("{}/capacity/next-7-days", base_url()))
        .send()
        .await
        .expect("capacity window");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("json body");
    let capacities = body["capacities"].as_array().expect("capacities");
    assert_eq!(capacities.len(), 7);

    for capacity in capacities {
        for meal in ["breakfast", "lunch", "dinner"] {
            let slot = &capacity[meal];
            assert!(slot["limit"].is_i64());
            assert!(slot["booked"].is_i64());
            assert_eq!(
                slot["remaining"].as_i64().expect("remaining"),
                slot["limit"].as_i64().expect("limit") - slot["booked"].as_i64().expect("booked")
            );
        }
    }
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_set_capacity_requires_admin() {
    let client = client_for_user(TEST_USER);
    let date = (Local::now().date_naive() + Duration::days(3)).to_string();

    let resp = client
        .post(format!("{}/capacity", base_url()))
        .json(&json!({ "date": date, "breakfast_capacity": 60 }))
        .send()
        .await
        .expect("set capacity");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_set_capacity_roundtrip() {
    let client = admin_client(TEST_ADMIN);
    let base = base_url();
    let date = (Local::now().date_naive() + Duration::days(5)).to_string();

    let resp = client
        .post(format!("{base}/capacity"))
        .json(&json!({
            "date": date,
            "breakfast_capacity": 40,
            "lunch_capacity": 60,
            "dinner_capacity": 55,
        }))
        .send()
        .await
        .expect("set capacity");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["capacity"]["breakfast"]["limit"], 40);
    assert_eq!(body["capacity"]["lunch"]["limit"], 60);
    assert_eq!(body["capacity"]["dinner"]["limit"], 55);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_shrink_below_booked_rejected() {
    let admin = admin_client(TEST_ADMIN);
    let user = client_for_user(TEST_USER);
    let base = base_url();
    let date = (Local::now().date_naive() + Duration::days(2)).to_string();

    // Book one dinner slot for the date
    let resp = user
        .post(format!("{base}/orders"))
        .json(&json!({
            "order_date": date,
            "meal_type": "dinner",
            "items": [{ "menu_item_id": 1, "quantity": 1 }],
            "address_id": 1,
        }))
        .send()
        .await
        .expect("place order");
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Shrinking dinner capacity to zero must fail and leave the limit alone
    let before: Value = user
        .get(format!("{base}/capacity/date/{date}"))
        .send()
        .await
        .expect("capacity")
        .json()
        .await
        .expect("json body");
    let limit_before = before["capacity"]["dinner"]["limit"]
        .as_i64()
        .expect("limit");

    let resp = admin
        .post(format!("{base}/capacity"))
        .json(&json!({ "date": date, "dinner_capacity": 0 }))
        .send()
        .await
        .expect("set capacity");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let after: Value = user
        .get(format!("{base}/capacity/date/{date}"))
        .send()
        .await
        .expect("capacity")
        .json()
        .await
        .expect("json body");
    assert_eq!(
        after["capacity"]["dinner"]["limit"].as_i64().expect("limit"),
        limit_before
    );
}
