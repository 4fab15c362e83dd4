//! Order domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tiffinbox_core::{AddressId, MealType, MenuItemId, OrderId, OrderStatus, PaymentStatus, UserId};

/// One line of an order: a menu item at its captured price.
///
/// Serialized into the order's JSON item columns; prices are captured at
/// placement time and do not track later catalog edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// One confirmed or pending delivery: one user, one date, one meal type,
/// one delivery address.
///
/// `delivery_address` and `nearest_landmark` are immutable snapshots of the
/// address at placement time, not live references - editing the address
/// later never changes what was printed on a historic order. `address_id`
/// is kept for reference only.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: String,
    pub order_date: NaiveDate,
    pub meal_type: MealType,
    /// Regular menu items.
    pub items: Vec<OrderLine>,
    /// Special/premium items, listed separately.
    pub special_items: Vec<OrderLine>,
    pub total_amount: Decimal,
    pub delivery_address: String,
    pub nearest_landmark: Option<String>,
    pub address_id: Option<AddressId>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
