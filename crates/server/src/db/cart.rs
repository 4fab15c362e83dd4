//! Cart repository.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use tiffinbox_core::{AddressId, CartItemId, MealType, MenuItemId, UserId};

use super::RepositoryError;
use crate::models::CartLine;

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i32,
    user_id: i32,
    menu_item_id: i32,
    order_date: NaiveDate,
    day_of_week: String,
    meal_type: String,
    quantity: i32,
    unit_price: Decimal,
    is_special_item: bool,
    item_name: String,
    address_id: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let meal_type = MealType::from_str(&row.meal_type).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid meal type in database: {e}"))
        })?;

        Ok(Self {
            id: CartItemId::new(row.id),
            user_id: UserId::new(row.user_id),
            menu_item_id: MenuItemId::new(row.menu_item_id),
            order_date: row.order_date,
            day_of_week: row.day_of_week,
            meal_type,
            quantity: row.quantity,
            unit_price: row.unit_price,
            is_special_item: row.is_special_item,
            item_name: row.item_name,
            address_id: row.address_id.map(AddressId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, user_id, menu_item_id, order_date, day_of_week, meal_type, \
     quantity, unit_price, is_special_item, item_name, address_id, created_at, updated_at";

/// Values captured when a cart line is created.
#[derive(Debug, Clone)]
pub struct NewCartLine {
    pub user_id: UserId,
    pub menu_item_id: MenuItemId,
    pub order_date: NaiveDate,
    pub day_of_week: String,
    pub meal_type: MealType,
    pub quantity: i32,
    /// Catalog price at add time.
    pub unit_price: Decimal,
    pub is_special_item: bool,
    /// Catalog name at add time.
    pub item_name: String,
    pub address_id: Option<AddressId>,
}

/// Repository for cart lines.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All of a user's cart lines, ordered by date then meal.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM cart_items \
             WHERE user_id = $1 \
             ORDER BY order_date ASC, meal_type ASC, id ASC"
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    /// Add a selection to the cart.
    ///
    /// If a line already exists for the same (user, menu item, date, meal
    /// type, address), its quantity is incremented instead of creating a
    /// duplicate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn add(&self, line: NewCartLine) -> Result<CartLine, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "INSERT INTO cart_items \
               (user_id, menu_item_id, order_date, day_of_week, meal_type, quantity, \
                unit_price, is_special_item, item_name, address_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (user_id, menu_item_id, order_date, meal_type, address_id) \
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, \
                           updated_at = NOW() \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(line.user_id.as_i32())
        .bind(line.menu_item_id.as_i32())
        .bind(line.order_date)
        .bind(line.day_of_week)
        .bind(line.meal_type.as_str())
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.is_special_item)
        .bind(line.item_name)
        .bind(line.address_id.map(|id| id.as_i32()))
        .fetch_one(self.pool)
        .await?;

        CartLine::try_from(row)
    }

    /// Change the quantity on a line owned by the user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such line exists for the user.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        line_id: CartItemId,
        quantity: i32,
    ) -> Result<CartLine, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "UPDATE cart_items SET quantity = $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(line_id.as_i32())
        .bind(user_id.as_i32())
        .bind(quantity)
        .fetch_optional(self.pool)
        .await?;

        row.map_or(Err(RepositoryError::NotFound), CartLine::try_from)
    }

    /// Change the delivery address on a line owned by the user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such line exists for the user.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_address(
        &self,
        user_id: UserId,
        line_id: CartItemId,
        address_id: Option<AddressId>,
    ) -> Result<CartLine, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "UPDATE cart_items SET address_id = $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(line_id.as_i32())
        .bind(user_id.as_i32())
        .bind(address_id.map(|id| id.as_i32()))
        .fetch_optional(self.pool)
        .await?;

        row.map_or(Err(RepositoryError::NotFound), CartLine::try_from)
    }

    /// Remove a line owned by the user.
    ///
    /// Returns `true` if a line was deleted, `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        line_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(line_id.as_i32())
            .bind(user_id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every line in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Remove the user's lines for one target date.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_for_date(
        &self,
        user_id: UserId,
        order_date: NaiveDate,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND order_date = $2")
            .bind(user_id.as_i32())
            .bind(order_date)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Sweep lines whose target date has already passed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_expired(
        &self,
        user_id: UserId,
        today: NaiveDate,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND order_date < $2")
            .bind(user_id.as_i32())
            .bind(today)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
