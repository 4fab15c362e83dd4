//! Cart route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use tiffinbox_core::{AddressId, CartItemId, MenuItemId};

use crate::db::cart::NewCartLine;
use crate::db::{AddressRepository, CartRepository, MenuRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::CartLine;
use crate::models::cart::{CartSummary, DeliveryGroup, group_by_delivery, summarize};
use crate::services::orders::OrderError;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Request body for adding a selection to the cart.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub menu_item_id: MenuItemId,
    pub order_date: NaiveDate,
    pub meal_type: tiffinbox_core::MealType,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub address_id: Option<AddressId>,
}

const fn default_quantity() -> i32 {
    1
}

/// Request body for changing a line's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

/// Request body for changing a line's delivery address.
#[derive(Debug, Deserialize)]
pub struct UpdateAddressRequest {
    pub address_id: Option<AddressId>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    pub cart_items: Vec<CartLine>,
    pub summary: CartSummary,
    pub delivery_groups: Vec<DeliveryGroup>,
}

#[derive(Debug, Serialize)]
pub struct CartLineResponse {
    pub success: bool,
    pub message: String,
    pub cart_item: CartLine,
}

#[derive(Debug, Serialize)]
pub struct CartMessageResponse {
    pub success: bool,
    pub message: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /cart` - lines, delivery groups, and totals.
pub async fn show(State(state): State<AppState>, user: CurrentUser) -> Result<Json<CartResponse>> {
    let lines = CartRepository::new(state.pool()).list(user.id).await?;
    let delivery_charge = state.config().delivery_charge;

    let groups = group_by_delivery(&lines, delivery_charge);
    let summary = summarize(&lines, &groups, delivery_charge);

    Ok(Json(CartResponse {
        success: true,
        cart_items: lines,
        summary,
        delivery_groups: groups,
    }))
}

/// `POST /cart` - add a selection, merging into an existing line when the
/// same (item, date, meal, address) is already present.
pub async fn add(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartLineResponse>> {
    if request.quantity < 1 {
        return Err(AppError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }

    // Cart additions only require the date not to be in the past; the full
    // ordering window is enforced at checkout.
    let today = Local::now().date_naive();
    if request.order_date < today {
        return Err(AppError::Order(OrderError::InvalidDate(
            "cannot add items for past dates".to_string(),
        )));
    }

    if let Some(address_id) = request.address_id {
        AddressRepository::new(state.pool())
            .find_owned_active(user.id, address_id)
            .await?
            .ok_or_else(|| {
                AppError::Order(OrderError::InvalidAddress(
                    "address is missing or inactive".to_string(),
                ))
            })?;
    }

    let item = MenuRepository::new(state.pool())
        .find_active_item(request.menu_item_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Menu item not found or inactive".to_string()))?;

    let line = CartRepository::new(state.pool())
        .add(NewCartLine {
            user_id: user.id,
            menu_item_id: item.id,
            order_date: request.order_date,
            day_of_week: request.order_date.format("%A").to_string().to_lowercase(),
            meal_type: request.meal_type,
            quantity: request.quantity,
            unit_price: item.unit_price,
            is_special_item: item.is_special_item,
            item_name: item.name,
            address_id: request.address_id,
        })
        .await?;

    Ok(Json(CartLineResponse {
        success: true,
        message: "Item added to cart".to_string(),
        cart_item: line,
    }))
}

/// `PUT /cart/{id}` - change a line's quantity.
pub async fn update_quantity(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<CartLineResponse>> {
    if request.quantity < 1 {
        return Err(AppError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let line = CartRepository::new(state.pool())
        .update_quantity(user.id, CartItemId::new(id), request.quantity)
        .await
        .map_err(map_line_not_found)?;

    Ok(Json(CartLineResponse {
        success: true,
        message: "Cart item updated".to_string(),
        cart_item: line,
    }))
}

/// `PATCH /cart/{id}/address` - change a line's delivery address.
pub async fn update_address(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateAddressRequest>,
) -> Result<Json<CartLineResponse>> {
    if let Some(address_id) = request.address_id {
        AddressRepository::new(state.pool())
            .find_owned_active(user.id, address_id)
            .await?
            .ok_or_else(|| {
                AppError::Order(OrderError::InvalidAddress(
                    "address is missing or inactive".to_string(),
                ))
            })?;
    }

    let line = CartRepository::new(state.pool())
        .update_address(user.id, CartItemId::new(id), request.address_id)
        .await
        .map_err(map_line_not_found)?;

    Ok(Json(CartLineResponse {
        success: true,
        message: "Delivery address updated".to_string(),
        cart_item: line,
    }))
}

/// `DELETE /cart/{id}` - remove a line.
pub async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<CartMessageResponse>> {
    let removed = CartRepository::new(state.pool())
        .remove(user.id, CartItemId::new(id))
        .await?;

    if !removed {
        return Err(AppError::NotFound("Cart item not found".to_string()));
    }

    Ok(Json(CartMessageResponse {
        success: true,
        message: "Item removed from cart".to_string(),
    }))
}

/// `DELETE /cart/clear/all` - clear the whole cart.
pub async fn clear(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<CartMessageResponse>> {
    CartRepository::new(state.pool()).clear(user.id).await?;

    Ok(Json(CartMessageResponse {
        success: true,
        message: "Cart cleared successfully".to_string(),
    }))
}

/// `DELETE /cart/clear/date/{date}` - clear lines for one date.
pub async fn clear_for_date(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(date): Path<NaiveDate>,
) -> Result<Json<CartMessageResponse>> {
    CartRepository::new(state.pool())
        .clear_for_date(user.id, date)
        .await?;

    Ok(Json(CartMessageResponse {
        success: true,
        message: "Cart items cleared for selected date".to_string(),
    }))
}

/// `DELETE /cart/clear/expired` - sweep past-dated lines.
pub async fn clear_expired(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<CartMessageResponse>> {
    let removed = CartRepository::new(state.pool())
        .clear_expired(user.id, Local::now().date_naive())
        .await?;

    Ok(Json(CartMessageResponse {
        success: true,
        message: format!("{removed} expired cart items removed"),
    }))
}

fn map_line_not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Cart item not found".to_string()),
        other => AppError::Database(other),
    }
}
