//! HTTP route handlers for the ordering API.
//!
//! All requests and responses are JSON. Identity arrives via the trusted
//! `x-user-id` / `x-user-role` headers (see [`crate::middleware::auth`]).
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (pings the database)
//!
//! # Orders
//! POST /orders                  - Place a single order
//! POST /orders/bulk             - Place one order per checkout group
//! GET  /orders                  - Order history (status/meal/date filters)
//! GET  /orders/today            - Today's orders
//! GET  /orders/date/{date}      - Orders for one date
//! GET  /orders/{id}             - One order
//! POST /orders/{id}/cancel      - Cancel an order
//!
//! # Cart
//! GET    /cart                  - Cart lines, delivery groups, totals
//! POST   /cart                  - Add a selection (merges duplicates)
//! PUT    /cart/{id}             - Change quantity
//! PATCH  /cart/{id}/address     - Change delivery address
//! DELETE /cart/{id}             - Remove a line
//! DELETE /cart/clear/all        - Clear the cart
//! DELETE /cart/clear/date/{date} - Clear lines for a date
//! DELETE /cart/clear/expired    - Sweep past-dated lines
//!
//! # Capacity
//! GET  /capacity/next-7-days    - Seven-day availability view
//! GET  /capacity/date/{date}    - One date's availability
//! POST /capacity                - Set limits for a date (admin)
//! POST /capacity/bulk-set       - Set limits for the next 7 days (admin)
//!
//! # Payments
//! POST /payments/checkout       - Create a gateway order for the cart
//! POST /payments/confirm        - Verify signature, materialize orders
//! POST /payments/failure        - Record a client-reported failure
//! GET  /payments                - Payment history
//! GET  /payments/{id}           - One payment record
//! ```

pub mod capacity;
pub mod cart;
pub mod orders;
pub mod payments;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create).get(orders::history))
        .route("/bulk", post(orders::create_bulk))
        .route("/today", get(orders::today))
        .route("/date/{date}", get(orders::for_date))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add))
        .route("/{id}", put(cart::update_quantity).delete(cart::remove))
        .route("/{id}/address", axum::routing::patch(cart::update_address))
        .route("/clear/all", delete(cart::clear))
        .route("/clear/date/{date}", delete(cart::clear_for_date))
        .route("/clear/expired", delete(cart::clear_expired))
}

/// Create the capacity routes router.
pub fn capacity_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(capacity::set_for_date))
        .route("/bulk-set", post(capacity::bulk_set))
        .route("/next-7-days", get(capacity::next_seven_days))
        .route("/date/{date}", get(capacity::for_date))
}

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(payments::initiate))
        .route("/confirm", post(payments::confirm))
        .route("/failure", post(payments::failure))
        .route("/", get(payments::history))
        .route("/{id}", get(payments::show))
}

/// Create all routes for the ordering API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/orders", order_routes())
        .nest("/cart", cart_routes())
        .nest("/capacity", capacity_routes())
        .nest("/payments", payment_routes())
}
