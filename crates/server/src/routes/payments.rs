//! Payment route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Local;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tiffinbox_core::PaymentId;

use crate::db::PaymentRepository;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::Payment;
use crate::routes::orders::BulkOrderGroupRequest;
use crate::services::checkout::{CheckoutGroup, CheckoutItem, CheckoutService};
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Request body for initiating a gateway payment for the cart.
#[derive(Debug, Deserialize)]
pub struct InitiatePaymentRequest {
    pub total_amount: Decimal,
}

/// Request body for confirming a gateway payment.
///
/// `orders` optionally carries freshly supplied checkout groups; when
/// absent, the snapshot stored at initiation is replayed.
#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
    pub orders: Option<Vec<BulkOrderGroupRequest>>,
}

/// Request body for recording a client-reported failure.
#[derive(Debug, Deserialize)]
pub struct PaymentFailureRequest {
    pub gateway_order_id: String,
}

/// Query parameters for payment history.
#[derive(Debug, Deserialize, Default)]
pub struct PaymentHistoryQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct InitiatePaymentResponse {
    pub success: bool,
    pub message: String,
    pub gateway_order_id: String,
    /// Amount in minor currency units, as the gateway expects.
    pub amount: i64,
    pub currency: String,
    pub payment_id: PaymentId,
    /// Public key id for the checkout widget.
    pub key_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmPaymentResponse {
    pub success: bool,
    pub message: String,
    pub payment_id: PaymentId,
    pub orders_created: usize,
    pub order_numbers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub success: bool,
    pub payment: Payment,
}

#[derive(Debug, Serialize)]
pub struct PaymentHistoryResponse {
    pub success: bool,
    pub payments: Vec<Payment>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct PaymentMessageResponse {
    pub success: bool,
    pub message: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /payments/checkout` - create a gateway order for the cart.
///
/// No orders exist and no capacity is reserved until the payment is
/// confirmed.
pub async fn initiate(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<Json<InitiatePaymentResponse>> {
    let initiated = CheckoutService::new(state.pool(), state.config(), state.gateway())
        .initiate(user.id, request.total_amount, Local::now().naive_local())
        .await?;

    Ok(Json(InitiatePaymentResponse {
        success: true,
        message: "Payment order created".to_string(),
        gateway_order_id: initiated.payment.gateway_order_id.clone(),
        amount: initiated.amount_minor,
        currency: initiated.currency,
        payment_id: initiated.payment.id,
        key_id: initiated.key_id,
    }))
}

/// `POST /payments/confirm` - verify the gateway signature and materialize
/// the orders.
///
/// Confirming an already-completed payment is idempotent: the stored result
/// is returned and nothing is created or reserved twice.
pub async fn confirm(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>> {
    let fresh_groups = request.orders.map(|groups| {
        groups
            .into_iter()
            .map(|group| CheckoutGroup {
                order_date: group.order_date,
                meal_type: group.meal_type,
                address_id: group.address_id,
                items: group
                    .items
                    .iter()
                    .map(|item| CheckoutItem {
                        menu_item_id: item.menu_item_id,
                        quantity: item.quantity,
                    })
                    .collect(),
                notes: group.notes,
            })
            .collect()
    });

    let confirmed = CheckoutService::new(state.pool(), state.config(), state.gateway())
        .confirm(
            user.id,
            &request.gateway_order_id,
            &request.gateway_payment_id,
            &request.gateway_signature,
            fresh_groups,
            Local::now().naive_local(),
        )
        .await?;

    let message = if confirmed.already_completed {
        "Payment already verified".to_string()
    } else {
        "Payment verified and orders created successfully".to_string()
    };

    Ok(Json(ConfirmPaymentResponse {
        success: true,
        message,
        payment_id: confirmed.payment.id,
        orders_created: confirmed.orders.len(),
        order_numbers: confirmed
            .orders
            .iter()
            .map(|order| order.order_number.clone())
            .collect(),
        errors: confirmed.errors,
    }))
}

/// `POST /payments/failure` - record a client-reported gateway failure.
pub async fn failure(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<PaymentFailureRequest>,
) -> Result<Json<PaymentMessageResponse>> {
    CheckoutService::new(state.pool(), state.config(), state.gateway())
        .record_failure(user.id, &request.gateway_order_id)
        .await?;

    Ok(Json(PaymentMessageResponse {
        success: true,
        message: "Payment failure recorded".to_string(),
    }))
}

/// `GET /payments/{id}` - one payment record.
pub async fn show(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<PaymentResponse>> {
    let payment = PaymentRepository::new(state.pool())
        .find(user.id, PaymentId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

    Ok(Json(PaymentResponse {
        success: true,
        payment,
    }))
}

/// `GET /payments` - payment history, newest first.
pub async fn history(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PaymentHistoryQuery>,
) -> Result<Json<PaymentHistoryResponse>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 50);
    let offset = (page - 1) * limit;

    let (payments, total) = PaymentRepository::new(state.pool())
        .history(user.id, limit, offset)
        .await?;

    Ok(Json(PaymentHistoryResponse {
        success: true,
        payments,
        total,
        page,
        pages: (total as u64).div_ceil(limit as u64) as i64,
    }))
}
