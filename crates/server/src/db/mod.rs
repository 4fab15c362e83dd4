//! Database operations for the ordering `PostgreSQL`.
//!
//! # Tables
//!
//! - `users` - Account rows referenced for ownership (auth lives upstream)
//! - `addresses` - Delivery addresses (read-only to this service)
//! - `menu_items` - Weekly menu catalog (read-only to this service)
//! - `cart_items` - Pending selections
//! - `orders` - Placed orders (never physically deleted)
//! - `meal_capacity` - Per-date booked-vs-limit counters
//! - `payments` - Gateway payment records
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p tiffinbox-cli -- migrate
//! ```
//! They are intentionally not run on server startup.
//!
//! # Query style
//!
//! Repositories use the runtime query API (`sqlx::query` / `query_as`) with
//! private row structs, mapped by hand into the domain types in
//! [`crate::models`]. Enum-ish columns are stored as text and parsed with
//! `FromStr`; a value the application cannot parse surfaces as
//! [`RepositoryError::DataCorruption`].

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod addresses;
pub mod capacity;
pub mod cart;
pub mod menu;
pub mod orders;
pub mod payments;

pub use addresses::AddressRepository;
pub use capacity::CapacityRepository;
pub use cart::CartRepository;
pub use menu::MenuRepository;
pub use orders::OrderRepository;
pub use payments::PaymentRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The referenced row does not exist.
    #[error("Not found")]
    NotFound,

    /// A stored value could not be interpreted.
    #[error("Data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
