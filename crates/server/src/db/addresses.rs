//! Address repository.
//!
//! Read-only address resolution for the ordering flows. Address CRUD and
//! admin verification live in the account service; this core only needs to
//! answer "is this address owned by the user, active, and verified" and to
//! hand over the text for snapshotting onto orders.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tiffinbox_core::{AddressId, AddressType, UserId};

use super::RepositoryError;
use crate::models::Address;

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: i32,
    user_id: i32,
    address_type: String,
    address: String,
    nearest_landmark: Option<String>,
    is_default: bool,
    is_active: bool,
    is_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AddressRow> for Address {
    type Error = RepositoryError;

    fn try_from(row: AddressRow) -> Result<Self, Self::Error> {
        let address_type = AddressType::from_str(&row.address_type).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid address type in database: {e}"))
        })?;

        Ok(Self {
            id: AddressId::new(row.id),
            user_id: UserId::new(row.user_id),
            address_type,
            address: row.address,
            nearest_landmark: row.nearest_landmark,
            is_default: row.is_default,
            is_active: row.is_active,
            is_verified: row.is_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, user_id, address_type, address, nearest_landmark, \
     is_default, is_active, is_verified, created_at, updated_at";

/// Repository for address lookups.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Resolve an address owned by the user that is active and verified.
    ///
    /// Returns `None` for a missing, foreign, inactive, or unverified
    /// address - callers treat all four the same way.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn find_owned_verified(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM addresses \
             WHERE id = $1 AND user_id = $2 AND is_active = TRUE AND is_verified = TRUE"
        ))
        .bind(address_id.as_i32())
        .bind(user_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(Address::try_from).transpose()
    }

    /// Resolve an address owned by the user that is active (verification not
    /// required). Used when parking an address on a cart line before
    /// checkout.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn find_owned_active(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM addresses \
             WHERE id = $1 AND user_id = $2 AND is_active = TRUE"
        ))
        .bind(address_id.as_i32())
        .bind(user_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(Address::try_from).transpose()
    }

    /// Resolve a set of addresses, keeping only those owned by the user,
    /// active, and verified. Used by bulk checkout to validate every
    /// referenced address up front.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn find_owned_verified_many(
        &self,
        user_id: UserId,
        address_ids: &[AddressId],
    ) -> Result<Vec<Address>, RepositoryError> {
        let ids: Vec<i32> = address_ids.iter().map(AddressId::as_i32).collect();

        let rows = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM addresses \
             WHERE id = ANY($1) AND user_id = $2 AND is_active = TRUE AND is_verified = TRUE"
        ))
        .bind(&ids)
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Address::try_from).collect()
    }
}
