//! Integration tests for payment-gated checkout.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p tiffinbox-server)
//! - `GATEWAY_KEY_SECRET` in the environment, matching the server's, so the
//!   tests can sign confirmation callbacks the way the gateway would
//! - Seeded menu items and a verified address for the test user
//!
//! Run with: cargo test -p tiffinbox-integration-tests -- --ignored

use chrono::{Duration, Local};
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use serde_json::{Value, json};
use sha2::Sha256;

use tiffinbox_integration_tests::{base_url, client_for_user};

const TEST_USER: i32 = 2;
const TEST_ADDRESS: i32 = 1;
const TEST_MENU_ITEM: i32 = 1;

type HmacSha256 = Hmac<Sha256>;

/// Sign a (order, payment) pair the way the gateway does.
fn sign(order_handle: &str, payment_handle: &str) -> String {
    let secret = std::env::var("GATEWAY_KEY_SECRET").expect("GATEWAY_KEY_SECRET must be set");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(order_handle.as_bytes());
    mac.update(b"|");
    mac.update(payment_handle.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Fill the cart with one line and return the cart total.
async fn seed_cart(client: &reqwest::Client) -> String {
    let base = base_url();
    let date = (Local::now().date_naive() + Duration::days(1)).to_string();

    let resp = client
        .post(format!("{base}/cart"))
        .json(&json!({
            "menu_item_id": TEST_MENU_ITEM,
            "order_date": date,
            "meal_type": "lunch",
            "quantity": 1,
            "address_id": TEST_ADDRESS,
        }))
        .send()
        .await
        .expect("add to cart");
    assert_eq!(resp.status(), StatusCode::OK);

    let cart: Value = client
        .get(format!("{base}/cart"))
        .send()
        .await
        .expect("fetch cart")
        .json()
        .await
        .expect("json body");
    cart["summary"]["total_amount"]
        .as_str()
        .expect("total")
        .to_string()
}

#[tokio::test]
#[ignore = "Requires running server, database, and GATEWAY_KEY_SECRET"]
async fn test_confirm_is_idempotent() {
    let client = client_for_user(TEST_USER);
    let base = base_url();

    let total = seed_cart(&client).await;

    // Initiate: no orders yet, no capacity reserved
    let resp = client
        .post(format!("{base}/payments/checkout"))
        .json(&json!({ "total_amount": total }))
        .send()
        .await
        .expect("initiate payment");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("json body");
    let gateway_order_id = body["gateway_order_id"].as_str().expect("handle").to_string();

    let payment_handle = "pay_integration_test";
    let signature = sign(&gateway_order_id, payment_handle);
    let confirm_body = json!({
        "gateway_order_id": gateway_order_id,
        "gateway_payment_id": payment_handle,
        "gateway_signature": signature,
    });

    let first: Value = client
        .post(format!("{base}/payments/confirm"))
        .json(&confirm_body)
        .send()
        .await
        .expect("first confirm")
        .json()
        .await
        .expect("json body");
    assert_eq!(first["success"], true);
    let created = first["orders_created"].as_u64().expect("count");
    assert!(created >= 1);

    // Confirming again must return the same order set without creating
    // duplicates or reserving capacity twice
    let second: Value = client
        .post(format!("{base}/payments/confirm"))
        .json(&confirm_body)
        .send()
        .await
        .expect("second confirm")
        .json()
        .await
        .expect("json body");
    assert_eq!(second["success"], true);
    assert_eq!(second["orders_created"].as_u64().expect("count"), created);
    assert_eq!(second["order_numbers"], first["order_numbers"]);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_confirm_rejects_bad_signature() {
    let client = client_for_user(TEST_USER);
    let base = base_url();

    let total = seed_cart(&client).await;

    let resp = client
        .post(format!("{base}/payments/checkout"))
        .json(&json!({ "total_amount": total }))
        .send()
        .await
        .expect("initiate payment");
    let body: Value = resp.json().await.expect("json body");
    let gateway_order_id = body["gateway_order_id"].as_str().expect("handle");

    let resp = client
        .post(format!("{base}/payments/confirm"))
        .json(&json!({
            "gateway_order_id": gateway_order_id,
            "gateway_payment_id": "pay_bogus",
            "gateway_signature": "deadbeef",
        }))
        .send()
        .await
        .expect("confirm");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // The payment record is now failed
    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_initiate_rejects_empty_cart() {
    let client = client_for_user(TEST_USER);
    let base = base_url();

    // Make sure the cart is empty
    client
        .delete(format!("{base}/cart/clear/all"))
        .send()
        .await
        .expect("clear cart");

    let resp = client
        .post(format!("{base}/payments/checkout"))
        .json(&json!({ "total_amount": "10.00" }))
        .send()
        .await
        .expect("initiate payment");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
