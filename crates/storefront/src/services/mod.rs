//! Business logic services for the storefront.
//!
//! - `catalog` - menu reads with a short-lived cache
//! - `cart` - the cart ledger bound to session storage
//! - `checkout` - order submission
//! - `notifier` - confirmation requests to the notification endpoint
//! - `email` - order mail over SMTP

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod email;
pub mod notifier;
