//! Per-date meal capacity domain types.

use chrono::NaiveDate;
use serde::Serialize;

use tiffinbox_core::{CapacityId, MealType};

/// Booked-vs-limit counters for one meal type on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MealSlot {
    pub capacity: i32,
    pub booked: i32,
}

impl MealSlot {
    /// Slots still available. Never negative.
    #[must_use]
    pub const fn remaining(self) -> i32 {
        let remaining = self.capacity - self.booked;
        if remaining > 0 { remaining } else { 0 }
    }
}

/// The capacity ledger record for one calendar date.
///
/// One row per date ever referenced; created lazily with the configured
/// default limits, mutated only through the capacity repository, never
/// deleted. Invariant: `booked <= capacity` for every meal type.
#[derive(Debug, Clone)]
pub struct MealCapacity {
    pub id: CapacityId,
    pub date: NaiveDate,
    pub day_of_week: String,
    pub breakfast: MealSlot,
    pub lunch: MealSlot,
    pub dinner: MealSlot,
}

impl MealCapacity {
    /// The slot for a given meal type.
    #[must_use]
    pub const fn slot(&self, meal_type: MealType) -> MealSlot {
        match meal_type {
            MealType::Breakfast => self.breakfast,
            MealType::Lunch => self.lunch,
            MealType::Dinner => self.dinner,
        }
    }

    /// Whether this record can still accept `quantity` more bookings for a
    /// meal type.
    #[must_use]
    pub const fn has_availability(&self, meal_type: MealType, quantity: i32) -> bool {
        self.slot(meal_type).remaining() >= quantity
    }
}

/// Serialized view of one meal slot: every capacity-bearing response carries
/// limit, booked, and remaining.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MealSlotView {
    pub limit: i32,
    pub booked: i32,
    pub remaining: i32,
}

impl From<MealSlot> for MealSlotView {
    fn from(slot: MealSlot) -> Self {
        Self {
            limit: slot.capacity,
            booked: slot.booked,
            remaining: slot.remaining(),
        }
    }
}

/// Serialized view of a capacity record.
#[derive(Debug, Clone, Serialize)]
pub struct CapacityView {
    pub date: NaiveDate,
    pub day_of_week: String,
    pub breakfast: MealSlotView,
    pub lunch: MealSlotView,
    pub dinner: MealSlotView,
}

impl From<&MealCapacity> for CapacityView {
    fn from(record: &MealCapacity) -> Self {
        Self {
            date: record.date,
            day_of_week: record.day_of_week.clone(),
            breakfast: record.breakfast.into(),
            lunch: record.lunch.into(),
            dinner: record.dinner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_never_negative() {
        let slot = MealSlot {
            capacity: 10,
            booked: 12,
        };
        assert_eq!(slot.remaining(), 0);
    }

    #[test]
    fn test_has_availability() {
        let record = MealCapacity {
            id: CapacityId::new(1),
            date: NaiveDate::from_ymd_opt(2026, 8, 10).expect("valid date"),
            day_of_week: "monday".to_string(),
            breakfast: MealSlot {
                capacity: 50,
                booked: 49,
            },
            lunch: MealSlot {
                capacity: 50,
                booked: 50,
            },
            dinner: MealSlot {
                capacity: 50,
                booked: 0,
            },
        };
        assert!(record.has_availability(MealType::Breakfast, 1));
        assert!(!record.has_availability(MealType::Breakfast, 2));
        assert!(!record.has_availability(MealType::Lunch, 1));
        assert!(record.has_availability(MealType::Dinner, 50));
    }

    #[test]
    fn test_slot_view_reports_all_three_numbers() {
        let view = MealSlotView::from(MealSlot {
            capacity: 50,
            booked: 20,
        });
        assert_eq!(view.limit, 50);
        assert_eq!(view.booked, 20);
        assert_eq!(view.remaining, 30);
    }
}
