//! Capacity ledger repository.
//!
//! Owns the per-date, per-meal-type booked-vs-limit counters that gate order
//! acceptance. All mutations are single conditional `UPDATE` statements so
//! that concurrent requests against the same (date, meal type) key cannot
//! lose updates: the reservation that loses a race sees zero rows affected
//! instead of overselling the slot.

use chrono::NaiveDate;
use sqlx::PgPool;
use sqlx::postgres::PgExecutor;

use tiffinbox_core::{CapacityId, MealType};

use super::RepositoryError;
use crate::models::{MealCapacity, MealSlot};

/// Per-meal-type capacity limits, used when creating or resizing a record.
#[derive(Debug, Clone, Copy)]
pub struct MealLimits {
    pub breakfast: i32,
    pub lunch: i32,
    pub dinner: i32,
}

impl MealLimits {
    /// Uniform limits for all three meals.
    #[must_use]
    pub const fn uniform(limit: i32) -> Self {
        Self {
            breakfast: limit,
            lunch: limit,
            dinner: limit,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CapacityRow {
    id: i32,
    date: NaiveDate,
    day_of_week: String,
    breakfast_capacity: i32,
    lunch_capacity: i32,
    dinner_capacity: i32,
    breakfast_booked: i32,
    lunch_booked: i32,
    dinner_booked: i32,
}

impl From<CapacityRow> for MealCapacity {
    fn from(row: CapacityRow) -> Self {
        Self {
            id: CapacityId::new(row.id),
            date: row.date,
            day_of_week: row.day_of_week,
            breakfast: MealSlot {
                capacity: row.breakfast_capacity,
                booked: row.breakfast_booked,
            },
            lunch: MealSlot {
                capacity: row.lunch_capacity,
                booked: row.lunch_booked,
            },
            dinner: MealSlot {
                capacity: row.dinner_capacity,
                booked: row.dinner_booked,
            },
        }
    }
}

const SELECT_COLUMNS: &str = "id, date, day_of_week, \
     breakfast_capacity, lunch_capacity, dinner_capacity, \
     breakfast_booked, lunch_booked, dinner_booked";

/// Conditional increment for one meal type, bounded by its limit.
const fn reserve_sql(meal_type: MealType) -> &'static str {
    match meal_type {
        MealType::Breakfast => {
            "UPDATE meal_capacity \
             SET breakfast_booked = breakfast_booked + $2, updated_at = NOW() \
             WHERE date = $1 AND breakfast_booked + $2 <= breakfast_capacity"
        }
        MealType::Lunch => {
            "UPDATE meal_capacity \
             SET lunch_booked = lunch_booked + $2, updated_at = NOW() \
             WHERE date = $1 AND lunch_booked + $2 <= lunch_capacity"
        }
        MealType::Dinner => {
            "UPDATE meal_capacity \
             SET dinner_booked = dinner_booked + $2, updated_at = NOW() \
             WHERE date = $1 AND dinner_booked + $2 <= dinner_capacity"
        }
    }
}

/// Decrement for one meal type, floored at zero.
const fn release_sql(meal_type: MealType) -> &'static str {
    match meal_type {
        MealType::Breakfast => {
            "UPDATE meal_capacity \
             SET breakfast_booked = GREATEST(0, breakfast_booked - $2), updated_at = NOW() \
             WHERE date = $1"
        }
        MealType::Lunch => {
            "UPDATE meal_capacity \
             SET lunch_booked = GREATEST(0, lunch_booked - $2), updated_at = NOW() \
             WHERE date = $1"
        }
        MealType::Dinner => {
            "UPDATE meal_capacity \
             SET dinner_booked = GREATEST(0, dinner_booked - $2), updated_at = NOW() \
             WHERE date = $1"
        }
    }
}

/// Lowercase weekday name for a date, stored alongside the counters.
fn day_of_week(date: NaiveDate) -> String {
    date.format("%A").to_string().to_lowercase()
}

/// Repository for the capacity ledger.
pub struct CapacityRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CapacityRepository<'a> {
    /// Create a new capacity repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the record for a date.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, date: NaiveDate) -> Result<Option<MealCapacity>, RepositoryError> {
        let row = sqlx::query_as::<_, CapacityRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM meal_capacity WHERE date = $1"
        ))
        .bind(date)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(MealCapacity::from))
    }

    /// Get the record for a date, creating it with the given default limits
    /// if absent.
    ///
    /// Creation is idempotent: a duplicate-key race resolves to the existing
    /// row, never a failure.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_or_create(
        &self,
        date: NaiveDate,
        defaults: MealLimits,
    ) -> Result<MealCapacity, RepositoryError> {
        Self::ensure_row(self.pool, date, defaults).await?;

        self.find(date).await?.ok_or(RepositoryError::NotFound)
    }

    /// Insert the row for a date if it does not exist yet.
    ///
    /// Callable on a pool or inside an open transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn ensure_row<'e, E: PgExecutor<'e>>(
        executor: E,
        date: NaiveDate,
        defaults: MealLimits,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO meal_capacity \
               (date, day_of_week, breakfast_capacity, lunch_capacity, dinner_capacity, \
                breakfast_booked, lunch_booked, dinner_booked) \
             VALUES ($1, $2, $3, $4, $5, 0, 0, 0) \
             ON CONFLICT (date) DO NOTHING",
        )
        .bind(date)
        .bind(day_of_week(date))
        .bind(defaults.breakfast)
        .bind(defaults.lunch)
        .bind(defaults.dinner)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Whether the slot can accept `quantity` more bookings.
    ///
    /// An absent record means the date has never been capped and is treated
    /// as unlimited. This check is advisory: the authoritative guard is
    /// [`Self::reserve`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_availability(
        &self,
        date: NaiveDate,
        meal_type: MealType,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        match self.find(date).await? {
            Some(record) => Ok(record.has_availability(meal_type, quantity)),
            None => Ok(true),
        }
    }

    /// Atomically increment the booked count for a slot.
    ///
    /// Returns `false` without changing anything if the increment would
    /// exceed the limit - including when this reservation lost a race for
    /// the last remaining slot. The row must already exist (see
    /// [`Self::ensure_row`]).
    ///
    /// Callable on a pool or inside an open transaction, so order creation
    /// and reservation can commit as one unit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn reserve<'e, E: PgExecutor<'e>>(
        executor: E,
        date: NaiveDate,
        meal_type: MealType,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(reserve_sql(meal_type))
            .bind(date)
            .bind(quantity)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Decrement the booked count for a slot, floored at zero.
    ///
    /// A no-op (not an error) if no record exists for the date.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn release(
        &self,
        date: NaiveDate,
        meal_type: MealType,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(release_sql(meal_type))
            .bind(date)
            .bind(quantity)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Replace the limits for a date.
    ///
    /// The update is guarded so no limit can drop below what is already
    /// booked, even if a reservation commits between read and write: zero
    /// rows affected means some requested limit was below its booked count
    /// and nothing changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_limits(
        &self,
        date: NaiveDate,
        limits: MealLimits,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE meal_capacity \
             SET breakfast_capacity = $2, lunch_capacity = $3, dinner_capacity = $4, \
                 updated_at = NOW() \
             WHERE date = $1 \
               AND breakfast_booked <= $2 AND lunch_booked <= $3 AND dinner_booked <= $4",
        )
        .bind(date)
        .bind(limits.breakfast)
        .bind(limits.lunch)
        .bind(limits.dinner)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Capacity records for `days` consecutive dates starting at `from`,
    /// creating missing ones with the default limits.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn window(
        &self,
        from: NaiveDate,
        days: u32,
        defaults: MealLimits,
    ) -> Result<Vec<MealCapacity>, RepositoryError> {
        let mut records = Vec::with_capacity(days as usize);
        for offset in 0..i64::from(days) {
            let date = from + chrono::Duration::days(offset);
            records.push(self.get_or_create(date, defaults).await?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_sql_targets_matching_columns() {
        for meal_type in MealType::ALL {
            let sql = reserve_sql(meal_type);
            let booked = format!("{meal_type}_booked");
            let capacity = format!("{meal_type}_capacity");
            assert!(sql.contains(booked.as_str()));
            assert!(sql.contains(capacity.as_str()));
        }
    }

    #[test]
    fn test_release_sql_floors_at_zero() {
        for meal_type in MealType::ALL {
            assert!(release_sql(meal_type).contains("GREATEST(0,"));
        }
    }

    #[test]
    fn test_day_of_week_lowercase() {
        let monday = NaiveDate::from_ymd_opt(2026, 8, 10).expect("valid date");
        assert_eq!(day_of_week(monday), "monday");
        let sunday = NaiveDate::from_ymd_opt(2026, 8, 9).expect("valid date");
        assert_eq!(day_of_week(sunday), "sunday");
    }
}
