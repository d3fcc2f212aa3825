//! Dar Sellami Core - Shared types library.
//!
//! This crate provides the types and pure logic shared by every Dar Sellami
//! component:
//! - `storefront` - Public ordering site (menu, cart, checkout)
//! - `admin` - Staff dashboard behind the admin session guard
//! - `cli` - Command-line tools for migrations and account provisioning
//!
//! # Architecture
//!
//! The core crate contains only types, pure computations and traits - no
//! database access, no HTTP clients. Durable storage is reached through the
//! [`KeyValueStore`] trait so that cart and session state can be exercised
//! with an in-memory store.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails and delivery types
//! - [`cart`] - The cart ledger, pending quantity edits and the URL codec
//! - [`order`] - Order assembly: totals, persistable record and notification
//! - [`storage`] - Durable key-value storage seam
//! - [`clock`] - Time source for session expiry

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod clock;
pub mod order;
pub mod storage;
pub mod types;

pub use cart::{Cart, CartLedger, PendingEdits, QuantityEdit};
pub use clock::{Clock, ManualClock, SystemClock};
pub use order::{
    AssembleError, AssembledOrder, CustomerDetails, DEFAULT_DELIVERY_FEE, FulfillmentSelection,
    NewOrder, Order, OrderItem, OrderNotification, OrderStats, OrderTotals, assemble,
};
pub use storage::{KeyValueStore, MemoryStore, StorageError};
pub use types::*;
