//! Menu catalog repository.
//!
//! The catalog is managed elsewhere; ordering only resolves active items to
//! validate line items and capture prices.

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::PgPool;

use tiffinbox_core::{MealType, MenuItemId};

use super::RepositoryError;
use crate::models::MenuItem;

#[derive(Debug, sqlx::FromRow)]
struct MenuItemRow {
    id: i32,
    name: String,
    meal_type: String,
    unit_price: Decimal,
    is_special_item: bool,
    description: Option<String>,
    image_url: Option<String>,
    is_active: bool,
}

impl TryFrom<MenuItemRow> for MenuItem {
    type Error = RepositoryError;

    fn try_from(row: MenuItemRow) -> Result<Self, Self::Error> {
        let meal_type = MealType::from_str(&row.meal_type).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid meal type in database: {e}"))
        })?;

        Ok(Self {
            id: MenuItemId::new(row.id),
            name: row.name,
            meal_type,
            unit_price: row.unit_price,
            is_special_item: row.is_special_item,
            description: row.description,
            image_url: row.image_url,
            is_active: row.is_active,
        })
    }
}

/// Repository for menu item lookups.
pub struct MenuRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MenuRepository<'a> {
    /// Create a new menu repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Resolve the given ids to currently active menu items.
    ///
    /// Inactive or unknown ids are simply absent from the result; callers
    /// diff against the requested set to report what is unavailable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn find_active_items(
        &self,
        ids: &[MenuItemId],
    ) -> Result<Vec<MenuItem>, RepositoryError> {
        let raw_ids: Vec<i32> = ids.iter().map(MenuItemId::as_i32).collect();

        let rows = sqlx::query_as::<_, MenuItemRow>(
            "SELECT id, name, meal_type, unit_price, is_special_item, \
                    description, image_url, is_active \
             FROM menu_items \
             WHERE id = ANY($1) AND is_active = TRUE",
        )
        .bind(&raw_ids)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(MenuItem::try_from).collect()
    }

    /// Resolve one currently active menu item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn find_active_item(
        &self,
        id: MenuItemId,
    ) -> Result<Option<MenuItem>, RepositoryError> {
        let row = sqlx::query_as::<_, MenuItemRow>(
            "SELECT id, name, meal_type, unit_price, is_special_item, \
                    description, image_url, is_active \
             FROM menu_items \
             WHERE id = $1 AND is_active = TRUE",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(MenuItem::try_from).transpose()
    }
}
