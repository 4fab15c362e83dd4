//! Integration tests for TiffinBox.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and run migrations
//! docker compose up -d postgres
//! cargo run -p tiffinbox-cli -- migrate
//!
//! # Start the server
//! cargo run -p tiffinbox-server
//!
//! # Run the ignored integration tests
//! cargo test -p tiffinbox-integration-tests -- --ignored
//! ```
//!
//! Tests talk to a running server over HTTP and assume the upstream auth
//! proxy's trusted identity headers, so each test picks its own user id.

use reqwest::Client;

/// Base URL for the ordering API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("TIFFINBOX_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// An HTTP client that sends the trusted identity headers for a user.
///
/// # Panics
///
/// Panics if the client cannot be constructed.
#[must_use]
pub fn client_for_user(user_id: i32) -> Client {
    use reqwest::header::{HeaderMap, HeaderValue};

    let mut headers = HeaderMap::new();
    headers.insert(
        "x-user-id",
        HeaderValue::from_str(&user_id.to_string()).expect("valid header"),
    );

    Client::builder()
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

/// An HTTP client that sends admin identity headers.
///
/// # Panics
///
/// Panics if the client cannot be constructed.
#[must_use]
pub fn admin_client(user_id: i32) -> Client {
    use reqwest::header::{HeaderMap, HeaderValue};

    let mut headers = HeaderMap::new();
    headers.insert(
        "x-user-id",
        HeaderValue::from_str(&user_id.to_string()).expect("valid header"),
    );
    headers.insert("x-user-role", HeaderValue::from_static("admin"));

    Client::builder()
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}
