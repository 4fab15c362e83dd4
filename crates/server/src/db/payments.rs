//! Payment record repository.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::Row;

use tiffinbox_core::{OrderId, PaymentId, UserId};

use super::RepositoryError;
use crate::models::{Payment, PaymentRecordStatus};

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i32,
    user_id: i32,
    gateway_order_id: String,
    gateway_payment_id: Option<String>,
    gateway_signature: Option<String>,
    amount: Decimal,
    currency: String,
    status: String,
    cart_snapshot: Option<serde_json::Value>,
    order_ids: Option<serde_json::Value>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = RepositoryError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status = PaymentRecordStatus::from_str(&row.status).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid payment status in database: {e}"))
        })?;
        let order_ids: Vec<OrderId> = match row.order_ids {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid order id list in database: {e}"))
            })?,
            None => Vec::new(),
        };

        Ok(Self {
            id: PaymentId::new(row.id),
            user_id: UserId::new(row.user_id),
            gateway_order_id: row.gateway_order_id,
            gateway_payment_id: row.gateway_payment_id,
            gateway_signature: row.gateway_signature,
            amount: row.amount,
            currency: row.currency,
            status,
            cart_snapshot: row.cart_snapshot,
            order_ids,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, user_id, gateway_order_id, gateway_payment_id, gateway_signature, \
     amount, currency, status, cart_snapshot, order_ids, completed_at, created_at, updated_at";

/// Repository for gateway payment records.
pub struct PaymentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentRepository<'a> {
    /// Create a new payment repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a freshly created gateway order with its cart snapshot.
    ///
    /// No order rows or capacity reservations exist at this point.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the gateway order id already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert_created(
        &self,
        user_id: UserId,
        gateway_order_id: &str,
        amount: Decimal,
        currency: &str,
        cart_snapshot: &serde_json::Value,
    ) -> Result<Payment, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "INSERT INTO payments \
               (user_id, gateway_order_id, amount, currency, status, cart_snapshot) \
             VALUES ($1, $2, $3, $4, 'created', $5) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(user_id.as_i32())
        .bind(gateway_order_id)
        .bind(amount)
        .bind(currency)
        .bind(cart_snapshot)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!(
                    "payment already exists for gateway order {gateway_order_id}"
                ));
            }
            RepositoryError::Database(e)
        })?;

        Payment::try_from(row)
    }

    /// Find the user's payment record for a gateway order handle.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn find_by_gateway_order(
        &self,
        user_id: UserId,
        gateway_order_id: &str,
    ) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM payments \
             WHERE gateway_order_id = $1 AND user_id = $2"
        ))
        .bind(gateway_order_id)
        .bind(user_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(Payment::try_from).transpose()
    }

    /// Get one of the user's payment records.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn find(
        &self,
        user_id: UserId,
        payment_id: PaymentId,
    ) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM payments WHERE id = $1 AND user_id = $2"
        ))
        .bind(payment_id.as_i32())
        .bind(user_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(Payment::try_from).transpose()
    }

    /// Mark a payment failed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the payment does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn mark_failed(&self, payment_id: PaymentId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE payments SET status = 'failed', updated_at = NOW() WHERE id = $1")
                .bind(payment_id.as_i32())
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Mark a payment completed, linking the created orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the payment does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn mark_completed(
        &self,
        payment_id: PaymentId,
        gateway_payment_id: &str,
        gateway_signature: &str,
        order_ids: &[OrderId],
    ) -> Result<Payment, RepositoryError> {
        let order_ids_json = serde_json::to_value(order_ids).map_err(|e| {
            RepositoryError::DataCorruption(format!("failed to serialize order ids: {e}"))
        })?;

        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "UPDATE payments \
             SET status = 'completed', gateway_payment_id = $2, gateway_signature = $3, \
                 order_ids = $4, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(payment_id.as_i32())
        .bind(gateway_payment_id)
        .bind(gateway_signature)
        .bind(order_ids_json)
        .fetch_optional(self.pool)
        .await?;

        row.map_or(Err(RepositoryError::NotFound), Payment::try_from)
    }

    /// The user's payment history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn history(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Payment>, i64), RepositoryError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM payments WHERE user_id = $1")
            .bind(user_id.as_i32())
            .fetch_one(self.pool)
            .await?
            .try_get("total")?;

        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM payments \
             WHERE user_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(user_id.as_i32())
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let payments = rows
            .into_iter()
            .map(Payment::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((payments, total))
    }
}
