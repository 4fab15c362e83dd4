//! Business services over the repositories.

pub mod checkout;
pub mod gateway;
pub mod orders;

pub use checkout::CheckoutService;
pub use gateway::{HttpGateway, PaymentGateway};
pub use orders::OrderService;
