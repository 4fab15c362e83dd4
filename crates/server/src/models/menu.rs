//! Menu catalog domain type.

use rust_decimal::Decimal;
use serde::Serialize;

use tiffinbox_core::{MealType, MenuItemId};

/// An item on the weekly menu.
///
/// The catalog itself is managed elsewhere; this core only needs to resolve
/// active items when validating orders and cart additions.
#[derive(Debug, Clone, Serialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    pub meal_type: MealType,
    pub unit_price: Decimal,
    /// Premium items are priced and listed separately on the order.
    pub is_special_item: bool,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
}
