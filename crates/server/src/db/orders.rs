//! Order repository.
//!
//! Orders are never physically deleted: cancellation and admin actions are
//! status transitions on the same row.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgExecutor;
use sqlx::{PgPool, QueryBuilder, Row};

use tiffinbox_core::{AddressId, MealType, OrderId, OrderStatus, PaymentStatus, UserId};

use super::RepositoryError;
use crate::models::{Order, OrderLine};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    order_number: String,
    order_date: NaiveDate,
    meal_type: String,
    selected_items: serde_json::Value,
    special_items: serde_json::Value,
    total_amount: Decimal,
    delivery_address: String,
    nearest_landmark: Option<String>,
    address_id: Option<i32>,
    status: String,
    payment_status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let meal_type = MealType::from_str(&row.meal_type).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid meal type in database: {e}"))
        })?;
        let status = OrderStatus::from_str(&row.status).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
        })?;
        let payment_status = PaymentStatus::from_str(&row.payment_status).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid payment status in database: {e}"))
        })?;
        let items: Vec<OrderLine> = serde_json::from_value(row.selected_items).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order items in database: {e}"))
        })?;
        let special_items: Vec<OrderLine> =
            serde_json::from_value(row.special_items).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid special items in database: {e}"))
            })?;

        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            order_number: row.order_number,
            order_date: row.order_date,
            meal_type,
            items,
            special_items,
            total_amount: row.total_amount,
            delivery_address: row.delivery_address,
            nearest_landmark: row.nearest_landmark,
            address_id: row.address_id.map(AddressId::new),
            status,
            payment_status,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, user_id, order_number, order_date, meal_type, selected_items, \
     special_items, total_amount, delivery_address, nearest_landmark, address_id, \
     status, payment_status, notes, created_at, updated_at";

/// Values for a new order row.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub order_number: String,
    pub order_date: NaiveDate,
    pub meal_type: MealType,
    pub items: Vec<OrderLine>,
    pub special_items: Vec<OrderLine>,
    pub total_amount: Decimal,
    /// Address text snapshot, immutable once written.
    pub delivery_address: String,
    pub nearest_landmark: Option<String>,
    pub address_id: Option<AddressId>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
}

/// Filters for the order history listing.
#[derive(Debug, Clone, Default)]
pub struct OrderHistoryFilter {
    pub status: Option<OrderStatus>,
    pub meal_type: Option<MealType>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

/// Repository for order persistence.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order row.
    ///
    /// Callable inside an open transaction so the insert can commit together
    /// with its capacity reservation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    /// Returns `RepositoryError::DataCorruption` if the items fail to serialize.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        order: &NewOrder,
    ) -> Result<Order, RepositoryError> {
        let items = serde_json::to_value(&order.items).map_err(|e| {
            RepositoryError::DataCorruption(format!("failed to serialize order items: {e}"))
        })?;
        let special_items = serde_json::to_value(&order.special_items).map_err(|e| {
            RepositoryError::DataCorruption(format!("failed to serialize special items: {e}"))
        })?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders \
               (user_id, order_number, order_date, meal_type, selected_items, special_items, \
                total_amount, delivery_address, nearest_landmark, address_id, status, \
                payment_status, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(order.user_id.as_i32())
        .bind(&order.order_number)
        .bind(order.order_date)
        .bind(order.meal_type.as_str())
        .bind(items)
        .bind(special_items)
        .bind(order.total_amount)
        .bind(&order.delivery_address)
        .bind(&order.nearest_landmark)
        .bind(order.address_id.map(|id| id.as_i32()))
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.notes)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!(
                    "order number already exists: {}",
                    order.order_number
                ));
            }
            RepositoryError::Database(e)
        })?;

        Order::try_from(row)
    }

    /// Get one of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn find(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(order_id.as_i32())
        .bind(user_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    /// The user's orders for one date, in serving order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn for_date(
        &self,
        user_id: UserId,
        order_date: NaiveDate,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM orders \
             WHERE user_id = $1 AND order_date = $2 \
             ORDER BY meal_type ASC, created_at ASC"
        ))
        .bind(user_id.as_i32())
        .bind(order_date)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Filtered, paginated order history, newest first.
    ///
    /// Returns the page of orders and the total count matching the filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn history(
        &self,
        user_id: UserId,
        filter: &OrderHistoryFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let mut count_query =
            QueryBuilder::new("SELECT COUNT(*) AS total FROM orders WHERE user_id = ");
        count_query.push_bind(user_id.as_i32());
        push_filters(&mut count_query, filter);

        let total: i64 = count_query
            .build()
            .fetch_one(self.pool)
            .await?
            .try_get("total")?;

        let mut page_query = QueryBuilder::new(format!(
            "SELECT {SELECT_COLUMNS} FROM orders WHERE user_id = "
        ));
        page_query.push_bind(user_id.as_i32());
        push_filters(&mut page_query, filter);
        page_query.push(" ORDER BY order_date DESC, created_at DESC LIMIT ");
        page_query.push_bind(limit);
        page_query.push(" OFFSET ");
        page_query.push_bind(offset);

        let rows: Vec<OrderRow> = page_query
            .build_query_as::<OrderRow>()
            .fetch_all(self.pool)
            .await?;

        let orders = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((orders, total))
    }

    /// Transition one of the user's orders to cancelled, appending the
    /// cancellation note.
    ///
    /// The update is guarded on the current status still being cancellable,
    /// so a concurrent admin transition or a retried cancellation cannot
    /// cancel twice. Returns `None` if the guard did not match.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn transition_to_cancelled(
        &self,
        user_id: UserId,
        order_id: OrderId,
        notes: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders \
             SET status = 'cancelled', notes = $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND status IN ('pending', 'confirmed') \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(order_id.as_i32())
        .bind(user_id.as_i32())
        .bind(notes)
        .fetch_optional(self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }
}

fn push_filters(query: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &OrderHistoryFilter) {
    if let Some(status) = filter.status {
        query.push(" AND status = ");
        query.push_bind(status.as_str());
    }
    if let Some(meal_type) = filter.meal_type {
        query.push(" AND meal_type = ");
        query.push_bind(meal_type.as_str());
    }
    if let Some(from_date) = filter.from_date {
        query.push(" AND order_date >= ");
        query.push_bind(from_date);
    }
    if let Some(to_date) = filter.to_date {
        query.push(" AND order_date <= ");
        query.push_bind(to_date);
    }
}
