//! Cart checkout: bulk order creation and the payment-gated variant.
//!
//! Bulk checkout turns a cart into one order per (date, meal type, address)
//! group. Groups fail independently - a sold-out dinner does not abort the
//! sibling lunches - but an invalid address anywhere fails the whole batch
//! before any order is created. Payment-gated checkout defers all of this
//! until the gateway confirms payment, so no capacity is held for unpaid
//! carts.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use tiffinbox_core::{AddressId, MealType, OrderId, OrderStatus, PaymentStatus, UserId};

use crate::config::ServerConfig;
use crate::db::{AddressRepository, CartRepository, PaymentRepository, RepositoryError};
use crate::models::cart::{DeliveryGroup, group_by_delivery, summarize};
use crate::models::{Order, Payment, PaymentRecordStatus};
use crate::services::gateway::{GatewayError, PaymentGateway};
use crate::services::orders::{LineSelection, OrderError, OrderService, PlaceOrder};

/// Tolerance when comparing a declared total against the cart's computed
/// total.
const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2); // 0.01

/// Failures specific to checkout and payment confirmation.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines to check out.
    #[error("Cart is empty")]
    EmptyCart,

    /// The declared total is missing or non-positive.
    #[error("Valid total amount is required")]
    InvalidAmount,

    /// The declared total does not match the cart contents.
    #[error("Total amount does not match cart contents")]
    AmountMismatch,

    /// No payment record exists for the gateway order handle.
    #[error("Payment record not found")]
    PaymentNotFound,

    /// The completed payment carries no cart snapshot to replay.
    #[error("Cart data not found for order creation")]
    MissingSnapshot,

    /// Gateway interaction failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A group-level order failure that invalidates the whole request
    /// (currently only address validation).
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Underlying persistence failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// One checkout group: the cart lines destined for a single order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutGroup {
    pub order_date: chrono::NaiveDate,
    pub meal_type: MealType,
    pub address_id: AddressId,
    pub items: Vec<CheckoutItem>,
    pub notes: Option<String>,
}

/// One item in a checkout group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub menu_item_id: tiffinbox_core::MenuItemId,
    pub quantity: i32,
}

/// Result of a bulk placement: created orders plus per-group errors.
///
/// Partial success is a first-class outcome; the batch succeeded if at
/// least one order was created.
#[derive(Debug)]
pub struct BulkOutcome {
    pub orders: Vec<Order>,
    pub errors: Vec<String>,
}

/// A gateway order ready for the client-side payment widget.
#[derive(Debug)]
pub struct InitiatedPayment {
    pub payment: Payment,
    /// Amount in minor currency units, as the gateway echoes it.
    pub amount_minor: i64,
    pub currency: String,
    /// Public key id for the checkout widget.
    pub key_id: String,
}

/// Result of a payment confirmation.
#[derive(Debug)]
pub struct ConfirmedCheckout {
    pub payment: Payment,
    pub orders: Vec<Order>,
    pub errors: Vec<String>,
    /// True when this call found the payment already completed and returned
    /// the stored result instead of creating anything.
    pub already_completed: bool,
}

/// Checkout flows over the shared order placement routine.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    config: &'a ServerConfig,
    gateway: &'a dyn PaymentGateway,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        config: &'a ServerConfig,
        gateway: &'a dyn PaymentGateway,
    ) -> Self {
        Self {
            pool,
            config,
            gateway,
        }
    }

    /// Convert checkout groups into orders, one per group.
    ///
    /// Orders are created `pending`/`pending`; payment is collected
    /// separately.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Order(InvalidAddress)` if any referenced
    /// address fails validation - the whole batch is rejected before any
    /// order is created. Other group-level failures are recorded in the
    /// outcome instead.
    pub async fn place_bulk(
        &self,
        user_id: UserId,
        groups: Vec<CheckoutGroup>,
        now: NaiveDateTime,
    ) -> Result<BulkOutcome, CheckoutError> {
        if groups.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        self.place_groups(
            user_id,
            groups,
            OrderStatus::Pending,
            PaymentStatus::Pending,
            now,
        )
        .await
    }

    /// Create a gateway order for the user's cart and record a pending
    /// payment with a snapshot of the delivery groups.
    ///
    /// No order rows and no capacity reservations are created here; both
    /// happen in [`Self::confirm`] once the gateway signature checks out.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart`, `InvalidAmount`, or `AmountMismatch` for cart
    /// validation failures; `Order(InvalidAddress)` if a cart line still has
    /// no delivery address; gateway or repository errors otherwise.
    pub async fn initiate(
        &self,
        user_id: UserId,
        declared_total: Decimal,
        now: NaiveDateTime,
    ) -> Result<InitiatedPayment, CheckoutError> {
        if declared_total <= Decimal::ZERO {
            return Err(CheckoutError::InvalidAmount);
        }

        let lines = CartRepository::new(self.pool).list(user_id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let groups = group_by_delivery(&lines, self.config.delivery_charge);
        if groups.iter().any(|group| group.address_id.is_none()) {
            return Err(CheckoutError::Order(OrderError::InvalidAddress(
                "every cart line needs a delivery address before checkout".to_string(),
            )));
        }

        let computed_total = summarize(&lines, &groups, self.config.delivery_charge).total_amount;
        if (computed_total - declared_total).abs() > AMOUNT_TOLERANCE {
            return Err(CheckoutError::AmountMismatch);
        }

        let receipt = format!("cart_{}", now.and_utc().timestamp_millis());
        let remote = self
            .gateway
            .create_remote_order(computed_total, &self.config.gateway.currency, &receipt)
            .await?;

        let snapshot = serde_json::to_value(&groups).map_err(|e| {
            RepositoryError::DataCorruption(format!("failed to serialize cart snapshot: {e}"))
        })?;

        let payment = PaymentRepository::new(self.pool)
            .insert_created(
                user_id,
                &remote.id,
                computed_total,
                &remote.currency,
                &snapshot,
            )
            .await?;

        tracing::info!(
            gateway_order_id = %remote.id,
            groups = groups.len(),
            "payment initiated"
        );

        Ok(InitiatedPayment {
            payment,
            amount_minor: remote.amount,
            currency: remote.currency,
            key_id: self.gateway.key_id().to_string(),
        })
    }

    /// Verify a gateway confirmation and materialize the orders.
    ///
    /// On a valid signature the stored snapshot (or the freshly supplied
    /// groups) is replayed through the shared placement routine, each group
    /// becoming a confirmed, paid order; the live cart is then cleared and
    /// the payment marked completed. A second confirmation of an
    /// already-completed payment returns the stored result without creating
    /// orders or touching capacity.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotFound` for an unknown handle,
    /// `Order(PaymentVerificationFailed)` on a bad signature (the payment is
    /// marked failed), `MissingSnapshot` if there is nothing to replay.
    pub async fn confirm(
        &self,
        user_id: UserId,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
        fresh_groups: Option<Vec<CheckoutGroup>>,
        now: NaiveDateTime,
    ) -> Result<ConfirmedCheckout, CheckoutError> {
        let payments = PaymentRepository::new(self.pool);

        let payment = payments
            .find_by_gateway_order(user_id, gateway_order_id)
            .await?
            .ok_or(CheckoutError::PaymentNotFound)?;

        if payment.status == PaymentRecordStatus::Completed {
            let orders = self.load_orders(user_id, &payment.order_ids).await?;
            return Ok(ConfirmedCheckout {
                payment,
                orders,
                errors: Vec::new(),
                already_completed: true,
            });
        }

        if !self
            .gateway
            .verify_signature(gateway_order_id, gateway_payment_id, signature)
        {
            payments.mark_failed(payment.id).await?;
            tracing::warn!(
                gateway_order_id = %gateway_order_id,
                "payment signature verification failed"
            );
            return Err(CheckoutError::Order(OrderError::PaymentVerificationFailed));
        }

        let groups = match fresh_groups {
            Some(groups) => groups,
            None => snapshot_groups(payment.cart_snapshot.as_ref())?,
        };
        if groups.is_empty() {
            return Err(CheckoutError::MissingSnapshot);
        }

        let outcome = self
            .place_groups(
                user_id,
                groups,
                OrderStatus::Confirmed,
                PaymentStatus::Paid,
                now,
            )
            .await?;

        let order_ids: Vec<OrderId> = outcome.orders.iter().map(|order| order.id).collect();

        CartRepository::new(self.pool).clear(user_id).await?;

        let payment = payments
            .mark_completed(payment.id, gateway_payment_id, signature, &order_ids)
            .await?;

        tracing::info!(
            gateway_order_id = %gateway_order_id,
            orders_created = order_ids.len(),
            "payment confirmed"
        );

        Ok(ConfirmedCheckout {
            payment,
            orders: outcome.orders,
            errors: outcome.errors,
            already_completed: false,
        })
    }

    /// Record a client-reported gateway failure against the payment record.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotFound` for an unknown handle, or a repository
    /// error.
    pub async fn record_failure(
        &self,
        user_id: UserId,
        gateway_order_id: &str,
    ) -> Result<(), CheckoutError> {
        let payments = PaymentRepository::new(self.pool);
        let payment = payments
            .find_by_gateway_order(user_id, gateway_order_id)
            .await?
            .ok_or(CheckoutError::PaymentNotFound)?;

        // Completed payments stay completed; only pending ones flip.
        if payment.status == PaymentRecordStatus::Created {
            payments.mark_failed(payment.id).await?;
        }

        Ok(())
    }

    /// Validate all referenced addresses up front, then place one order per
    /// group, tolerating per-group failures.
    async fn place_groups(
        &self,
        user_id: UserId,
        groups: Vec<CheckoutGroup>,
        status: OrderStatus,
        payment_status: PaymentStatus,
        now: NaiveDateTime,
    ) -> Result<BulkOutcome, CheckoutError> {
        let distinct: BTreeSet<AddressId> =
            groups.iter().map(|group| group.address_id).collect();
        let address_ids: Vec<AddressId> = distinct.iter().copied().collect();

        let addresses = AddressRepository::new(self.pool)
            .find_owned_verified_many(user_id, &address_ids)
            .await?;
        if addresses.len() != address_ids.len() {
            return Err(CheckoutError::Order(OrderError::InvalidAddress(
                "one or more delivery addresses are invalid, inactive, or not verified"
                    .to_string(),
            )));
        }
        let address_map: HashMap<AddressId, _> = addresses
            .into_iter()
            .map(|address| (address.id, address))
            .collect();

        let order_service = OrderService::new(self.pool, self.config);
        let mut orders = Vec::new();
        let mut errors = Vec::new();

        for (index, group) in groups.into_iter().enumerate() {
            let Some(address) = address_map.get(&group.address_id) else {
                errors.push(format!("Order {}: invalid delivery address", index + 1));
                continue;
            };

            let command = PlaceOrder {
                order_date: group.order_date,
                meal_type: group.meal_type,
                items: group
                    .items
                    .iter()
                    .map(|item| LineSelection {
                        menu_item_id: item.menu_item_id,
                        quantity: item.quantity,
                    })
                    .collect(),
                address_id: group.address_id,
                notes: group.notes,
                status,
                payment_status,
            };

            match order_service
                .place_order_at(user_id, address, command, now)
                .await
            {
                Ok(order) => orders.push(order),
                // A failed group is reported, not fatal - siblings proceed
                Err(err) => errors.push(format!("Order {}: {err}", index + 1)),
            }
        }

        Ok(BulkOutcome { orders, errors })
    }

    async fn load_orders(
        &self,
        user_id: UserId,
        order_ids: &[OrderId],
    ) -> Result<Vec<Order>, RepositoryError> {
        let repository = crate::db::OrderRepository::new(self.pool);
        let mut orders = Vec::with_capacity(order_ids.len());
        for order_id in order_ids {
            if let Some(order) = repository.find(user_id, *order_id).await? {
                orders.push(order);
            }
        }
        Ok(orders)
    }
}

/// Decode the stored cart snapshot back into checkout groups.
fn snapshot_groups(
    snapshot: Option<&serde_json::Value>,
) -> Result<Vec<CheckoutGroup>, CheckoutError> {
    let value = snapshot.ok_or(CheckoutError::MissingSnapshot)?;
    let groups: Vec<DeliveryGroup> = serde_json::from_value(value.clone())
        .map_err(|_| CheckoutError::MissingSnapshot)?;

    groups
        .into_iter()
        .map(|group| {
            let address_id = group.address_id.ok_or_else(|| {
                CheckoutError::Order(OrderError::InvalidAddress(
                    "snapshot group has no delivery address".to_string(),
                ))
            })?;
            Ok(CheckoutGroup {
                order_date: group.order_date,
                meal_type: group.meal_type,
                address_id,
                items: group
                    .items
                    .iter()
                    .map(|item| CheckoutItem {
                        menu_item_id: item.menu_item_id,
                        quantity: item.quantity,
                    })
                    .collect(),
                notes: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tiffinbox_core::MenuItemId;

    #[test]
    fn test_snapshot_groups_roundtrip() {
        let group = DeliveryGroup {
            order_date: NaiveDate::from_ymd_opt(2026, 8, 10).expect("valid date"),
            meal_type: MealType::Lunch,
            address_id: Some(AddressId::new(4)),
            items: vec![crate::models::cart::GroupItem {
                menu_item_id: MenuItemId::new(2),
                name: "dal tadka".to_string(),
                quantity: 2,
                unit_price: Decimal::new(1200, 2),
                is_special_item: false,
            }],
            items_subtotal: Decimal::new(2400, 2),
            delivery_charge: Decimal::new(500, 2),
            total_amount: Decimal::new(2900, 2),
        };
        let snapshot = serde_json::to_value(vec![group]).expect("serialize");

        let groups = snapshot_groups(Some(&snapshot)).expect("decode");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].address_id, AddressId::new(4));
        assert_eq!(groups[0].items[0].menu_item_id, MenuItemId::new(2));
        assert_eq!(groups[0].items[0].quantity, 2);
    }

    #[test]
    fn test_snapshot_groups_requires_address() {
        let group = DeliveryGroup {
            order_date: NaiveDate::from_ymd_opt(2026, 8, 10).expect("valid date"),
            meal_type: MealType::Lunch,
            address_id: None,
            items: Vec::new(),
            items_subtotal: Decimal::ZERO,
            delivery_charge: Decimal::ZERO,
            total_amount: Decimal::ZERO,
        };
        let snapshot = serde_json::to_value(vec![group]).expect("serialize");

        assert!(matches!(
            snapshot_groups(Some(&snapshot)),
            Err(CheckoutError::Order(OrderError::InvalidAddress(_)))
        ));
    }

    #[test]
    fn test_snapshot_groups_missing() {
        assert!(matches!(
            snapshot_groups(None),
            Err(CheckoutError::MissingSnapshot)
        ));
    }

    #[test]
    fn test_amount_tolerance_is_one_paisa() {
        assert_eq!(AMOUNT_TOLERANCE, Decimal::new(1, 2));
    }
}
