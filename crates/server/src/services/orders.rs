//! Order lifecycle: placement and cancellation.
//!
//! [`OrderService::place_order`] is the one routine that turns a purchase
//! intent into a persisted order. Single orders, bulk cart checkout, and
//! payment-confirmed checkout all go through it, so the date-window, cutoff,
//! address, item, and capacity rules cannot drift between paths.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use tiffinbox_core::{
    AddressId, MealType, MenuItemId, OrderId, OrderStatus, PaymentStatus, UserId,
};

use crate::config::ServerConfig;
use crate::db::capacity::{CapacityRepository, MealLimits};
use crate::db::orders::{NewOrder, OrderRepository};
use crate::db::{AddressRepository, MenuRepository, RepositoryError};
use crate::models::{Address, MenuItem, Order, OrderLine};

/// How far ahead orders may be placed.
pub const MAX_ADVANCE_DAYS: i64 = 7;

/// Maximum stored length for free-text notes.
const MAX_NOTES_LEN: usize = 500;

/// Maximum stored length for a cancellation reason.
const MAX_REASON_LEN: usize = 200;

/// Request-level failures for order operations.
///
/// Every variant maps to a rejected operation with a descriptive reason,
/// never a crash.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order date is in the past or too far ahead.
    #[error("Invalid order date: {0}")]
    InvalidDate(String),

    /// The same-day cutoff for this meal has passed.
    #[error("Orders for {meal_type} must be placed before {cutoff_hour}:00")]
    OrderWindowClosed {
        meal_type: MealType,
        cutoff_hour: u32,
    },

    /// The delivery address is missing, inactive, unverified, or not owned
    /// by the requesting user.
    #[error("Invalid delivery address: {0}")]
    InvalidAddress(String),

    /// One or more menu items are unknown or no longer active.
    #[error("Some menu items are no longer available: {}", format_ids(.0))]
    ItemUnavailable(Vec<MenuItemId>),

    /// A line item carried a non-positive quantity.
    #[error("Invalid quantity for item {0}")]
    InvalidQuantity(MenuItemId),

    /// The order contained no line items.
    #[error("No items selected")]
    EmptyOrder,

    /// The meal slot is fully booked for that date.
    #[error("{meal_type} is fully booked for {date}")]
    CapacityExceeded { date: NaiveDate, meal_type: MealType },

    /// An admin tried to shrink a capacity limit below its booked count.
    #[error("{meal_type} capacity cannot be less than booked slots ({booked})")]
    InvalidCapacity { meal_type: MealType, booked: i32 },

    /// No such order for this user.
    #[error("Order not found")]
    NotFound,

    /// The order's current status does not allow the transition.
    #[error("Cannot cancel order with status '{status}'")]
    InvalidTransition { status: OrderStatus },

    /// The gateway callback signature did not match.
    #[error("Payment verification failed")]
    PaymentVerificationFailed,

    /// The generated order number collided with an existing one.
    #[error("Duplicate order number: {0}")]
    DuplicateOrderNumber(String),

    /// Underlying persistence failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn format_ids(ids: &[MenuItemId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One requested line: which item and how many.
///
/// Prices and names are always resolved from the catalog, never taken from
/// the request.
#[derive(Debug, Clone, Copy)]
pub struct LineSelection {
    pub menu_item_id: MenuItemId,
    pub quantity: i32,
}

/// A validated purchase intent for one (date, meal type, address) slot.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_date: NaiveDate,
    pub meal_type: MealType,
    pub items: Vec<LineSelection>,
    pub address_id: AddressId,
    pub notes: Option<String>,
    /// `Pending` for unpaid orders; the payment-confirmed path creates
    /// orders as `Confirmed`.
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
}

/// Order placement and cancellation against the capacity ledger.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    capacity_defaults: MealLimits,
    delivery_charge: Decimal,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub fn new(pool: &'a PgPool, config: &ServerConfig) -> Self {
        Self {
            pool,
            capacity_defaults: MealLimits::uniform(config.default_capacity),
            delivery_charge: config.delivery_charge,
        }
    }

    /// Place one order.
    ///
    /// Validates the date window, the same-day cutoff, the delivery address,
    /// and the line items; checks capacity; then persists the order and
    /// reserves its slot in a single transaction. If the reservation loses a
    /// capacity race after the advisory check passed, the order row is
    /// rolled back and `CapacityExceeded` is returned.
    ///
    /// # Errors
    ///
    /// See [`OrderError`] for the full taxonomy.
    pub async fn place_order(
        &self,
        user_id: UserId,
        command: PlaceOrder,
        now: NaiveDateTime,
    ) -> Result<Order, OrderError> {
        validate_order_date(command.order_date, now.date())?;
        check_order_cutoff(command.order_date, command.meal_type, now)?;

        let address = AddressRepository::new(self.pool)
            .find_owned_verified(user_id, command.address_id)
            .await?
            .ok_or_else(|| {
                OrderError::InvalidAddress(
                    "address is missing, inactive, or not verified".to_string(),
                )
            })?;

        self.place_order_at(user_id, &address, command, now).await
    }

    /// Place one order against an already resolved address.
    ///
    /// Bulk checkout validates every referenced address up front and calls
    /// this per group; [`Self::place_order`] is the single-order wrapper.
    ///
    /// # Errors
    ///
    /// See [`OrderError`] for the full taxonomy.
    pub async fn place_order_at(
        &self,
        user_id: UserId,
        address: &Address,
        command: PlaceOrder,
        now: NaiveDateTime,
    ) -> Result<Order, OrderError> {
        validate_order_date(command.order_date, now.date())?;
        check_order_cutoff(command.order_date, command.meal_type, now)?;

        if command.items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        for selection in &command.items {
            if selection.quantity < 1 {
                return Err(OrderError::InvalidQuantity(selection.menu_item_id));
            }
        }

        let requested: Vec<MenuItemId> = command
            .items
            .iter()
            .map(|selection| selection.menu_item_id)
            .collect();
        let catalog = MenuRepository::new(self.pool)
            .find_active_items(&requested)
            .await?;
        let missing: Vec<MenuItemId> = requested
            .iter()
            .filter(|id| !catalog.iter().any(|item| item.id == **id))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(OrderError::ItemUnavailable(missing));
        }

        // Advisory pre-check for a fast error; the reserve below is the
        // authoritative guard.
        let capacity = CapacityRepository::new(self.pool);
        if !capacity
            .has_availability(command.order_date, command.meal_type, 1)
            .await?
        {
            return Err(OrderError::CapacityExceeded {
                date: command.order_date,
                meal_type: command.meal_type,
            });
        }

        let (items, special_items) = build_lines(&command.items, &catalog);
        let items_subtotal: Decimal = items
            .iter()
            .chain(special_items.iter())
            .map(|line| line.unit_price * Decimal::from(line.quantity))
            .sum();
        let total_amount = items_subtotal + self.delivery_charge;

        let order_number = generate_order_number(now);
        let new_order = NewOrder {
            user_id,
            order_number: order_number.clone(),
            order_date: command.order_date,
            meal_type: command.meal_type,
            items,
            special_items,
            total_amount,
            delivery_address: address.address.clone(),
            nearest_landmark: address.nearest_landmark.clone(),
            address_id: Some(address.id),
            status: command.status,
            payment_status: command.payment_status,
            notes: command.notes.map(|notes| truncate(&notes, MAX_NOTES_LEN)),
        };

        // Order row and capacity reservation commit as one unit.
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        CapacityRepository::ensure_row(&mut *tx, command.order_date, self.capacity_defaults)
            .await?;

        let order = OrderRepository::insert(&mut *tx, &new_order)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => OrderError::DuplicateOrderNumber(order_number),
                other => OrderError::from(other),
            })?;

        let reserved =
            CapacityRepository::reserve(&mut *tx, command.order_date, command.meal_type, 1).await?;
        if !reserved {
            tx.rollback().await.map_err(RepositoryError::from)?;
            return Err(OrderError::CapacityExceeded {
                date: command.order_date,
                meal_type: command.meal_type,
            });
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(
            order_number = %order.order_number,
            order_date = %order.order_date,
            meal_type = %order.meal_type,
            "order placed"
        );

        Ok(order)
    }

    /// Cancel one of the user's orders and release its capacity slot.
    ///
    /// Same-day cancellation closes at the same cutoff as placement; there
    /// is no release path past the cutoff. The status transition is guarded
    /// and committed before capacity is released, so a retried cancellation
    /// can never release twice.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InvalidTransition`, or `OrderWindowClosed` per
    /// the rules above, or a repository error.
    pub async fn cancel_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
        reason: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Order, OrderError> {
        let orders = OrderRepository::new(self.pool);

        let order = orders
            .find(user_id, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if !order.status.can_cancel() {
            return Err(OrderError::InvalidTransition {
                status: order.status,
            });
        }

        check_order_cutoff(order.order_date, order.meal_type, now)?;

        let notes = cancellation_notes(order.notes.as_deref(), reason);
        let cancelled = orders
            .transition_to_cancelled(user_id, order_id, &notes)
            .await?
            .ok_or(OrderError::InvalidTransition {
                status: order.status,
            })?;

        // Only after the transition is durable: release exactly the one
        // slot this order reserved.
        CapacityRepository::new(self.pool)
            .release(cancelled.order_date, cancelled.meal_type, 1)
            .await?;

        tracing::info!(
            order_number = %cancelled.order_number,
            order_date = %cancelled.order_date,
            meal_type = %cancelled.meal_type,
            "order cancelled"
        );

        Ok(cancelled)
    }
}

/// Resolve selections against the catalog, splitting regular and special
/// items. Caller has already checked that every id resolves.
fn build_lines(
    selections: &[LineSelection],
    catalog: &[MenuItem],
) -> (Vec<OrderLine>, Vec<OrderLine>) {
    let mut items = Vec::new();
    let mut special_items = Vec::new();

    for selection in selections {
        let Some(item) = catalog.iter().find(|item| item.id == selection.menu_item_id) else {
            continue;
        };
        let line = OrderLine {
            menu_item_id: item.id,
            name: item.name.clone(),
            quantity: selection.quantity,
            unit_price: item.unit_price,
        };
        if item.is_special_item {
            special_items.push(line);
        } else {
            items.push(line);
        }
    }

    (items, special_items)
}

/// The order date must not be in the past and at most
/// [`MAX_ADVANCE_DAYS`] ahead.
pub fn validate_order_date(order_date: NaiveDate, today: NaiveDate) -> Result<(), OrderError> {
    if order_date < today {
        return Err(OrderError::InvalidDate(
            "cannot place orders for past dates".to_string(),
        ));
    }
    if order_date > today + Duration::days(MAX_ADVANCE_DAYS) {
        return Err(OrderError::InvalidDate(format!(
            "cannot place orders more than {MAX_ADVANCE_DAYS} days in advance"
        )));
    }
    Ok(())
}

/// Same-day orders close at the meal's cutoff hour; future dates are
/// unrestricted.
pub fn check_order_cutoff(
    order_date: NaiveDate,
    meal_type: MealType,
    now: NaiveDateTime,
) -> Result<(), OrderError> {
    if order_date == now.date() && now.hour() >= meal_type.cutoff_hour() {
        return Err(OrderError::OrderWindowClosed {
            meal_type,
            cutoff_hour: meal_type.cutoff_hour(),
        });
    }
    Ok(())
}

/// Unique-enough order number: millisecond timestamp plus a random suffix,
/// both base36. A collision surfaces as a uniqueness violation on insert,
/// never a silent retry.
fn generate_order_number(now: NaiveDateTime) -> String {
    let millis = now.and_utc().timestamp_millis();
    let suffix: String = {
        let mut rng = rand::rng();
        (0..5)
            .map(|_| {
                let idx = rng.random_range(0..BASE36.len());
                BASE36[idx] as char
            })
            .collect()
    };
    format!("ORD-{}-{}", to_base36(millis), suffix)
}

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn to_base36(mut n: i64) -> String {
    if n <= 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Append the cancellation marker and optional reason to existing notes.
fn cancellation_notes(existing: Option<&str>, reason: Option<&str>) -> String {
    let base = existing.unwrap_or_default();
    let appended = reason.map_or_else(
        || format!("{base}\n--- CANCELLED ---"),
        |reason| {
            format!(
                "{base}\n--- CANCELLED ---\nReason: {}",
                truncate(reason.trim(), MAX_REASON_LEN)
            )
        },
    );
    appended.trim().to_string()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    s.chars().take(max_len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn at(d: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
        d.and_time(NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time"))
    }

    #[test]
    fn test_order_date_rejects_past() {
        let today = date(2026, 8, 10);
        let result = validate_order_date(date(2026, 8, 9), today);
        assert!(matches!(result, Err(OrderError::InvalidDate(_))));
    }

    #[test]
    fn test_order_date_accepts_window() {
        let today = date(2026, 8, 10);
        assert!(validate_order_date(today, today).is_ok());
        assert!(validate_order_date(date(2026, 8, 17), today).is_ok());
    }

    #[test]
    fn test_order_date_rejects_beyond_seven_days() {
        let today = date(2026, 8, 10);
        let result = validate_order_date(date(2026, 8, 18), today);
        assert!(matches!(result, Err(OrderError::InvalidDate(_))));
    }

    #[test]
    fn test_cutoff_same_day_after_hour() {
        let today = date(2026, 8, 10);
        // Breakfast cutoff is 06:00; 07:00 is too late
        let result = check_order_cutoff(today, MealType::Breakfast, at(today, 7, 0));
        assert!(matches!(
            result,
            Err(OrderError::OrderWindowClosed {
                meal_type: MealType::Breakfast,
                cutoff_hour: 6,
            })
        ));
    }

    #[test]
    fn test_cutoff_exactly_at_hour_is_closed() {
        let today = date(2026, 8, 10);
        let result = check_order_cutoff(today, MealType::Lunch, at(today, 10, 0));
        assert!(result.is_err());
    }

    #[test]
    fn test_cutoff_same_day_before_hour() {
        let today = date(2026, 8, 10);
        assert!(check_order_cutoff(today, MealType::Breakfast, at(today, 5, 30)).is_ok());
        assert!(check_order_cutoff(today, MealType::Dinner, at(today, 15, 59)).is_ok());
    }

    #[test]
    fn test_cutoff_does_not_apply_to_future_dates() {
        let today = date(2026, 8, 10);
        let tomorrow = date(2026, 8, 11);
        assert!(check_order_cutoff(tomorrow, MealType::Breakfast, at(today, 23, 0)).is_ok());
    }

    #[test]
    fn test_order_number_shape() {
        let number = generate_order_number(at(date(2026, 8, 10), 9, 30));
        assert!(number.starts_with("ORD-"));
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].len(), 5);
        assert!(
            parts[1]
                .chars()
                .chain(parts[2].chars())
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_cancellation_notes_appends_reason() {
        let notes = cancellation_notes(Some("extra spicy"), Some("travelling this week"));
        assert!(notes.starts_with("extra spicy"));
        assert!(notes.contains("--- CANCELLED ---"));
        assert!(notes.contains("Reason: travelling this week"));
    }

    #[test]
    fn test_cancellation_notes_without_reason() {
        let notes = cancellation_notes(None, None);
        assert_eq!(notes, "--- CANCELLED ---");
    }

    #[test]
    fn test_cancellation_reason_truncated() {
        let long = "x".repeat(500);
        let notes = cancellation_notes(None, Some(&long));
        assert!(notes.len() < 300);
    }

    #[test]
    fn test_item_unavailable_message_lists_ids() {
        let err = OrderError::ItemUnavailable(vec![MenuItemId::new(3), MenuItemId::new(9)]);
        assert_eq!(
            err.to_string(),
            "Some menu items are no longer available: 3, 9"
        );
    }
}
