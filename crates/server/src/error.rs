//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers should return
//! `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::checkout::CheckoutError;
use crate::services::gateway::GatewayError;
use crate::services::orders::OrderError;

/// Application-level error type for the ordering API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// A rejected order operation (the request-level taxonomy).
    #[error("{0}")]
    Order(#[from] OrderError),

    /// A rejected checkout or payment operation.
    #[error("{0}")]
    Checkout(#[from] CheckoutError),

    /// Payment gateway operation failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller identity missing or not allowed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body returned for every rejected request.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

/// Status code for a rejected order operation.
fn order_error_status(err: &OrderError) -> StatusCode {
    match err {
        OrderError::InvalidDate(_)
        | OrderError::OrderWindowClosed { .. }
        | OrderError::InvalidAddress(_)
        | OrderError::ItemUnavailable(_)
        | OrderError::InvalidQuantity(_)
        | OrderError::EmptyOrder
        | OrderError::InvalidCapacity { .. }
        | OrderError::InvalidTransition { .. }
        | OrderError::PaymentVerificationFailed => StatusCode::BAD_REQUEST,
        OrderError::CapacityExceeded { .. } | OrderError::DuplicateOrderNumber(_) => {
            StatusCode::CONFLICT
        }
        OrderError::NotFound => StatusCode::NOT_FOUND,
        OrderError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Status code for a rejected checkout or payment operation.
fn checkout_error_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::EmptyCart
        | CheckoutError::InvalidAmount
        | CheckoutError::AmountMismatch
        | CheckoutError::MissingSnapshot => StatusCode::BAD_REQUEST,
        CheckoutError::PaymentNotFound => StatusCode::NOT_FOUND,
        CheckoutError::Gateway(_) => StatusCode::BAD_GATEWAY,
        CheckoutError::Order(inner) => order_error_status(inner),
        CheckoutError::Repository(inner) => repository_error_status(inner),
    }
}

fn repository_error_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_error_status(err),
            Self::Order(err) => order_error_status(err),
            Self::Checkout(err) => checkout_error_status(err),
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else if status == StatusCode::BAD_GATEWAY {
            "Payment gateway error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            success: false,
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tiffinbox_core::{MealType, OrderStatus};

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_order_taxonomy_status_codes() {
        assert_eq!(
            get_status(AppError::Order(OrderError::InvalidDate(
                "past".to_string()
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Order(OrderError::OrderWindowClosed {
                meal_type: MealType::Breakfast,
                cutoff_hour: 6,
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Order(OrderError::CapacityExceeded {
                date: NaiveDate::from_ymd_opt(2026, 8, 10).expect("valid date"),
                meal_type: MealType::Lunch,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Order(OrderError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Order(OrderError::InvalidTransition {
                status: OrderStatus::Delivered,
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Order(OrderError::PaymentVerificationFailed)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Order(OrderError::DuplicateOrderNumber(
                "ORD-X-Y".to_string()
            ))),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_infra_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("order 7".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("missing identity".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("bad date".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_capacity_exceeded_message() {
        let err = AppError::Order(OrderError::CapacityExceeded {
            date: NaiveDate::from_ymd_opt(2026, 8, 10).expect("valid date"),
            meal_type: MealType::Dinner,
        });
        assert_eq!(err.to_string(), "dinner is fully booked for 2026-08-10");
    }
}
