//! Meal types and same-day ordering cutoffs.

use serde::{Deserialize, Serialize};

/// The three daily meal slots.
///
/// Each slot is the unit of capacity tracking and cutoff enforcement: a
/// capacity record keeps one booked/limit pair per meal type, and same-day
/// orders close at that meal's cutoff hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    /// All meal types, in serving order.
    pub const ALL: [Self; 3] = [Self::Breakfast, Self::Lunch, Self::Dinner];

    /// The latest wall-clock hour (local time) at which a same-day order or
    /// cancellation for this meal is still accepted.
    #[must_use]
    pub const fn cutoff_hour(self) -> u32 {
        match self {
            Self::Breakfast => 6,
            Self::Lunch => 10,
            Self::Dinner => 16,
        }
    }

    /// Stable lowercase name, matching the database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
        }
    }
}

impl std::fmt::Display for MealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            _ => Err(format!("invalid meal type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_cutoff_hours() {
        assert_eq!(MealType::Breakfast.cutoff_hour(), 6);
        assert_eq!(MealType::Lunch.cutoff_hour(), 10);
        assert_eq!(MealType::Dinner.cutoff_hour(), 16);
    }

    #[test]
    fn test_roundtrip_str() {
        for meal in MealType::ALL {
            assert_eq!(MealType::from_str(meal.as_str()), Ok(meal));
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!(MealType::from_str("brunch").is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&MealType::Breakfast).expect("serialize"),
            "\"breakfast\""
        );
        let meal: MealType = serde_json::from_str("\"dinner\"").expect("deserialize");
        assert_eq!(meal, MealType::Dinner);
    }
}
