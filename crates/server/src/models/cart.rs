//! Shopping cart domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tiffinbox_core::{AddressId, CartItemId, MealType, MenuItemId, UserId};

/// A pending selection in a user's cart.
///
/// `unit_price` and `item_name` are captured when the line is added; later
/// catalog price changes do not reprice lines already in the cart. At most
/// one line exists per (user, menu item, date, meal type, address) - adding
/// the same selection again increments `quantity`.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub user_id: UserId,
    pub menu_item_id: MenuItemId,
    pub order_date: NaiveDate,
    pub day_of_week: String,
    pub meal_type: MealType,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub is_special_item: bool,
    pub item_name: String,
    pub address_id: Option<AddressId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    /// Line subtotal (price x quantity).
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A (date, meal type, address) bucket of cart lines.
///
/// Each group becomes exactly one order at checkout and incurs one delivery
/// charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryGroup {
    pub order_date: NaiveDate,
    pub meal_type: MealType,
    pub address_id: Option<AddressId>,
    pub items: Vec<GroupItem>,
    pub items_subtotal: Decimal,
    pub delivery_charge: Decimal,
    pub total_amount: Decimal,
}

/// One cart line flattened into its delivery group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupItem {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub is_special_item: bool,
}

/// Cart totals reported alongside the lines.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub total_items: i32,
    pub items_subtotal: Decimal,
    pub delivery_charges: Decimal,
    pub total_amount: Decimal,
    pub total_orders: usize,
    pub delivery_charge_per_order: Decimal,
}

/// Bucket cart lines into delivery groups, ordered by (date, meal, address).
///
/// `delivery_charge` is the flat per-group charge added on top of each
/// group's item subtotal.
#[must_use]
pub fn group_by_delivery(lines: &[CartLine], delivery_charge: Decimal) -> Vec<DeliveryGroup> {
    let mut buckets: BTreeMap<(NaiveDate, MealType, Option<AddressId>), Vec<&CartLine>> =
        BTreeMap::new();
    for line in lines {
        buckets
            .entry((line.order_date, line.meal_type, line.address_id))
            .or_default()
            .push(line);
    }

    buckets
        .into_iter()
        .map(|((order_date, meal_type, address_id), bucket)| {
            let items: Vec<GroupItem> = bucket
                .iter()
                .map(|line| GroupItem {
                    menu_item_id: line.menu_item_id,
                    name: line.item_name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    is_special_item: line.is_special_item,
                })
                .collect();
            let items_subtotal: Decimal = bucket.iter().map(|line| line.subtotal()).sum();
            DeliveryGroup {
                order_date,
                meal_type,
                address_id,
                items,
                items_subtotal,
                delivery_charge,
                total_amount: items_subtotal + delivery_charge,
            }
        })
        .collect()
}

/// Compute the cart summary from its delivery groups.
#[must_use]
pub fn summarize(lines: &[CartLine], groups: &[DeliveryGroup], delivery_charge: Decimal) -> CartSummary {
    let total_items: i32 = lines.iter().map(|line| line.quantity).sum();
    let items_subtotal: Decimal = lines.iter().map(CartLine::subtotal).sum();
    let delivery_charges = delivery_charge * Decimal::from(groups.len() as i64);
    CartSummary {
        total_items,
        items_subtotal,
        delivery_charges,
        total_amount: items_subtotal + delivery_charges,
        total_orders: groups.len(),
        delivery_charge_per_order: delivery_charge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(
        id: i32,
        date: NaiveDate,
        meal_type: MealType,
        address: Option<i32>,
        quantity: i32,
        price: Decimal,
    ) -> CartLine {
        CartLine {
            id: CartItemId::new(id),
            user_id: UserId::new(1),
            menu_item_id: MenuItemId::new(id),
            order_date: date,
            day_of_week: "monday".to_string(),
            meal_type,
            quantity,
            unit_price: price,
            is_special_item: false,
            item_name: format!("item-{id}"),
            address_id: address.map(AddressId::new),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_grouping_by_date_meal_address() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 10).expect("valid date");
        let lines = vec![
            line(1, date, MealType::Lunch, Some(1), 2, Decimal::new(1000, 2)),
            line(2, date, MealType::Lunch, Some(1), 1, Decimal::new(500, 2)),
            line(3, date, MealType::Dinner, Some(1), 1, Decimal::new(800, 2)),
            line(4, date, MealType::Lunch, Some(2), 1, Decimal::new(1000, 2)),
        ];
        let groups = group_by_delivery(&lines, Decimal::new(500, 2));
        assert_eq!(groups.len(), 3);

        let lunch_addr1 = groups
            .iter()
            .find(|g| g.meal_type == MealType::Lunch && g.address_id == Some(AddressId::new(1)))
            .expect("lunch group");
        assert_eq!(lunch_addr1.items.len(), 2);
        // 2 x 10.00 + 1 x 5.00 = 25.00, + 5.00 delivery
        assert_eq!(lunch_addr1.items_subtotal, Decimal::new(2500, 2));
        assert_eq!(lunch_addr1.total_amount, Decimal::new(3000, 2));
    }

    #[test]
    fn test_summary_counts_one_charge_per_group() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 10).expect("valid date");
        let lines = vec![
            line(1, date, MealType::Breakfast, Some(1), 1, Decimal::new(600, 2)),
            line(2, date, MealType::Dinner, Some(1), 3, Decimal::new(900, 2)),
        ];
        let charge = Decimal::new(500, 2);
        let groups = group_by_delivery(&lines, charge);
        let summary = summarize(&lines, &groups, charge);

        assert_eq!(summary.total_items, 4);
        assert_eq!(summary.total_orders, 2);
        // 6.00 + 27.00 items, 2 x 5.00 delivery
        assert_eq!(summary.items_subtotal, Decimal::new(3300, 2));
        assert_eq!(summary.delivery_charges, Decimal::new(1000, 2));
        assert_eq!(summary.total_amount, Decimal::new(4300, 2));
    }

    #[test]
    fn test_empty_cart_has_no_groups() {
        let groups = group_by_delivery(&[], Decimal::new(500, 2));
        assert!(groups.is_empty());
    }
}
