//! Delivery address domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tiffinbox_core::{AddressId, AddressType, UserId};

/// A user-owned delivery address.
///
/// This core only reads addresses: placement resolves one for validation and
/// copies its text into the order as an immutable snapshot. Address CRUD
/// lives with the account service.
#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub address_type: AddressType,
    /// Full address text.
    pub address: String,
    /// Nearest well-known landmark, used by delivery riders.
    pub nearest_landmark: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    /// Set by an administrator after manual verification. Orders may only be
    /// delivered to verified addresses.
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
