//! Domain types for the ordering API.
//!
//! These types represent validated domain objects separate from database row
//! types. Repositories map raw rows into these structs; handlers serialize
//! them into responses.

pub mod address;
pub mod capacity;
pub mod cart;
pub mod menu;
pub mod order;
pub mod payment;

pub use address::Address;
pub use capacity::{CapacityView, MealCapacity, MealSlot, MealSlotView};
pub use cart::{CartLine, CartSummary, DeliveryGroup};
pub use menu::MenuItem;
pub use order::{Order, OrderLine};
pub use payment::{Payment, PaymentRecordStatus};
