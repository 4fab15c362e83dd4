//! Core types for TiffinBox.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod meal;
pub mod status;

pub use id::*;
pub use meal::MealType;
pub use status::{AddressType, OrderStatus, PaymentStatus, UserRole};
