//! Order route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use tiffinbox_core::{AddressId, MealType, MenuItemId, OrderId, OrderStatus, PaymentStatus};

use crate::db::OrderRepository;
use crate::db::orders::OrderHistoryFilter;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::Order;
use crate::services::checkout::{CheckoutGroup, CheckoutItem, CheckoutService};
use crate::services::orders::{LineSelection, OrderService, PlaceOrder};
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// One requested line item.
#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub menu_item_id: MenuItemId,
    pub quantity: i32,
}

/// Request body for placing a single order.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub order_date: NaiveDate,
    pub meal_type: MealType,
    pub items: Vec<OrderItemRequest>,
    pub address_id: AddressId,
    pub notes: Option<String>,
}

/// One group in a bulk order request.
#[derive(Debug, Deserialize)]
pub struct BulkOrderGroupRequest {
    pub order_date: NaiveDate,
    pub meal_type: MealType,
    pub items: Vec<OrderItemRequest>,
    pub address_id: AddressId,
    pub notes: Option<String>,
}

/// Request body for bulk checkout.
#[derive(Debug, Deserialize)]
pub struct CreateBulkOrdersRequest {
    pub orders: Vec<BulkOrderGroupRequest>,
}

/// Request body for cancelling an order.
#[derive(Debug, Deserialize, Default)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

/// Query parameters for order history.
#[derive(Debug, Deserialize, Default)]
pub struct OrderHistoryQuery {
    pub status: Option<OrderStatus>,
    pub meal_type: Option<MealType>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub order: Order,
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub success: bool,
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize)]
pub struct BulkOrdersResponse {
    pub success: bool,
    pub message: String,
    pub orders: Vec<Order>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub page_size: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderHistoryResponse {
    pub success: bool,
    pub orders: Vec<Order>,
    pub pagination: Pagination,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /orders` - place a single order.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Response> {
    let command = PlaceOrder {
        order_date: request.order_date,
        meal_type: request.meal_type,
        items: request
            .items
            .iter()
            .map(|item| LineSelection {
                menu_item_id: item.menu_item_id,
                quantity: item.quantity,
            })
            .collect(),
        address_id: request.address_id,
        notes: request.notes,
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
    };

    let order = OrderService::new(state.pool(), state.config())
        .place_order(user.id, command, Local::now().naive_local())
        .await?;

    let body = OrderResponse {
        success: true,
        message: "Order created successfully".to_string(),
        order,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// `POST /orders/bulk` - one order per checkout group, partial failures
/// reported per group.
pub async fn create_bulk(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateBulkOrdersRequest>,
) -> Result<Response> {
    let groups: Vec<CheckoutGroup> = request
        .orders
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
        .collect();

    let outcome = CheckoutService::new(state.pool(), state.config(), state.gateway())
        .place_bulk(user.id, groups, Local::now().naive_local())
        .await?;

    // Success means at least one order was created
    if outcome.orders.is_empty() {
        let body = BulkOrdersResponse {
            success: false,
            message: "Failed to create orders".to_string(),
            orders: Vec::new(),
            errors: outcome.errors,
        };
        return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
    }

    let body = BulkOrdersResponse {
        success: true,
        message: format!("{} order(s) created successfully", outcome.orders.len()),
        orders: outcome.orders,
        errors: outcome.errors,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// `POST /orders/{id}/cancel` - cancel an order and release its slot.
pub async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(request): Json<CancelOrderRequest>,
) -> Result<Json<OrderResponse>> {
    let order = OrderService::new(state.pool(), state.config())
        .cancel_order(
            user.id,
            OrderId::new(id),
            request.reason.as_deref(),
            Local::now().naive_local(),
        )
        .await?;

    Ok(Json(OrderResponse {
        success: true,
        message: "Order cancelled successfully".to_string(),
        order,
    }))
}

/// `GET /orders/{id}` - one of the user's orders.
pub async fn show(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<OrderResponse>> {
    let order = OrderRepository::new(state.pool())
        .find(user.id, OrderId::new(id))
        .await?
        .ok_or_else(|| crate::error::AppError::NotFound("Order not found".to_string()))?;

    Ok(Json(OrderResponse {
        success: true,
        message: String::new(),
        order,
    }))
}

/// `GET /orders` - filtered, paginated history.
pub async fn history(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<OrderHistoryQuery>,
) -> Result<Json<OrderHistoryResponse>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 50);
    let offset = (page - 1) * limit;

    let filter = OrderHistoryFilter {
        status: query.status,
        meal_type: query.meal_type,
        from_date: query.from_date,
        to_date: query.to_date,
    };

    let (orders, total) = OrderRepository::new(state.pool())
        .history(user.id, &filter, limit, offset)
        .await?;

    let total_pages = (total as u64).div_ceil(limit as u64) as i64;

    Ok(Json(OrderHistoryResponse {
        success: true,
        orders,
        pagination: Pagination {
            current_page: page,
            total_pages,
            total_count: total,
            page_size: limit,
        },
    }))
}

/// `GET /orders/date/{date}` - the user's orders for one date.
pub async fn for_date(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(date): Path<NaiveDate>,
) -> Result<Json<OrdersResponse>> {
    let orders = OrderRepository::new(state.pool())
        .for_date(user.id, date)
        .await?;

    Ok(Json(OrdersResponse {
        success: true,
        orders,
    }))
}

/// `GET /orders/today` - the user's orders for today.
pub async fn today(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<OrdersResponse>> {
    let orders = OrderRepository::new(state.pool())
        .for_date(user.id, Local::now().date_naive())
        .await?;

    Ok(Json(OrdersResponse {
        success: true,
        orders,
    }))
}
