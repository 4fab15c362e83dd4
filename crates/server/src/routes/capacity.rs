//! Capacity route handlers.
//!
//! Every capacity-bearing response reports limit, booked, and remaining per
//! meal type (see [`crate::models::capacity::MealSlotView`]).

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use tiffinbox_core::MealType;

use crate::db::CapacityRepository;
use crate::db::capacity::MealLimits;
use crate::error::{AppError, Result};
use crate::middleware::{CurrentUser, RequireAdmin};
use crate::models::{CapacityView, MealCapacity};
use crate::services::orders::OrderError;
use crate::state::AppState;

/// Days covered by the rolling availability view.
const CAPACITY_WINDOW_DAYS: u32 = 7;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Request body for setting one date's limits. Omitted meals keep their
/// current limit.
#[derive(Debug, Deserialize)]
pub struct SetCapacityRequest {
    pub date: NaiveDate,
    pub breakfast_capacity: Option<i32>,
    pub lunch_capacity: Option<i32>,
    pub dinner_capacity: Option<i32>,
}

/// Request body for applying one set of limits to the next seven days.
#[derive(Debug, Deserialize)]
pub struct BulkSetCapacityRequest {
    pub breakfast_capacity: i32,
    pub lunch_capacity: i32,
    pub dinner_capacity: i32,
}

#[derive(Debug, Serialize)]
pub struct CapacityResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub capacity: CapacityView,
}

#[derive(Debug, Serialize)]
pub struct CapacitiesResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub capacities: Vec<CapacityView>,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /capacity/next-7-days` - rolling availability view, creating
/// missing records with the default limits.
pub async fn next_seven_days(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<CapacitiesResponse>> {
    let defaults = MealLimits::uniform(state.config().default_capacity);
    let records = CapacityRepository::new(state.pool())
        .window(Local::now().date_naive(), CAPACITY_WINDOW_DAYS, defaults)
        .await?;

    Ok(Json(CapacitiesResponse {
        success: true,
        message: String::new(),
        capacities: records.iter().map(CapacityView::from).collect(),
    }))
}

/// `GET /capacity/date/{date}` - one date's availability.
pub async fn for_date(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(date): Path<NaiveDate>,
) -> Result<Json<CapacityResponse>> {
    let defaults = MealLimits::uniform(state.config().default_capacity);
    let record = CapacityRepository::new(state.pool())
        .get_or_create(date, defaults)
        .await?;

    Ok(Json(CapacityResponse {
        success: true,
        message: String::new(),
        capacity: CapacityView::from(&record),
    }))
}

/// `POST /capacity` - set limits for one date (admin).
///
/// Fails with `InvalidCapacity` when a requested limit is below that meal's
/// booked count; the record is left unchanged.
pub async fn set_for_date(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(request): Json<SetCapacityRequest>,
) -> Result<Json<CapacityResponse>> {
    for limit in [
        request.breakfast_capacity,
        request.lunch_capacity,
        request.dinner_capacity,
    ]
    .into_iter()
    .flatten()
    {
        if limit < 0 {
            return Err(AppError::BadRequest(
                "Capacity must be non-negative".to_string(),
            ));
        }
    }

    let repository = CapacityRepository::new(state.pool());
    let defaults = MealLimits::uniform(state.config().default_capacity);
    let current = repository.get_or_create(request.date, defaults).await?;

    let limits = MealLimits {
        breakfast: request
            .breakfast_capacity
            .unwrap_or(current.breakfast.capacity),
        lunch: request.lunch_capacity.unwrap_or(current.lunch.capacity),
        dinner: request.dinner_capacity.unwrap_or(current.dinner.capacity),
    };

    let applied = repository.set_limits(request.date, limits).await?;
    if !applied {
        // Re-read to report which meal blocked the shrink
        let record = repository.get_or_create(request.date, defaults).await?;
        return Err(AppError::Order(blocking_meal(&record, limits)));
    }

    let record = repository.get_or_create(request.date, defaults).await?;

    Ok(Json(CapacityResponse {
        success: true,
        message: "Meal capacity saved successfully".to_string(),
        capacity: CapacityView::from(&record),
    }))
}

/// `POST /capacity/bulk-set` - apply one set of limits to the next seven
/// days (admin).
///
/// Days where any new limit would fall below the booked count are skipped,
/// not failed.
pub async fn bulk_set(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(request): Json<BulkSetCapacityRequest>,
) -> Result<Json<CapacitiesResponse>> {
    let limits = MealLimits {
        breakfast: request.breakfast_capacity,
        lunch: request.lunch_capacity,
        dinner: request.dinner_capacity,
    };
    if limits.breakfast < 0 || limits.lunch < 0 || limits.dinner < 0 {
        return Err(AppError::BadRequest(
            "Capacity must be non-negative".to_string(),
        ));
    }

    let repository = CapacityRepository::new(state.pool());
    let defaults = MealLimits::uniform(state.config().default_capacity);
    let today = Local::now().date_naive();

    let mut capacities = Vec::with_capacity(CAPACITY_WINDOW_DAYS as usize);
    for offset in 0..i64::from(CAPACITY_WINDOW_DAYS) {
        let date = today + chrono::Duration::days(offset);
        repository.get_or_create(date, defaults).await?;
        // Guarded update; a day with more bookings than the new limit is
        // left as-is
        repository.set_limits(date, limits).await?;
        capacities.push(repository.get_or_create(date, defaults).await?);
    }

    Ok(Json(CapacitiesResponse {
        success: true,
        message: "Bulk capacity set successfully".to_string(),
        capacities: capacities.iter().map(CapacityView::from).collect(),
    }))
}

/// Identify which meal made a limit change invalid.
fn blocking_meal(record: &MealCapacity, limits: MealLimits) -> OrderError {
    for (meal_type, requested) in [
        (MealType::Breakfast, limits.breakfast),
        (MealType::Lunch, limits.lunch),
        (MealType::Dinner, limits.dinner),
    ] {
        let booked = record.slot(meal_type).booked;
        if requested < booked {
            return OrderError::InvalidCapacity { meal_type, booked };
        }
    }
    // The guard re-read raced with a release; report the first meal as a
    // conservative fallback
    OrderError::InvalidCapacity {
        meal_type: MealType::Breakfast,
        booked: record.breakfast.booked,
    }
}
