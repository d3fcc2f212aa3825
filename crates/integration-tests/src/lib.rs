//! Integration tests for Dar Sellami.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (fakes, no database)
//! cargo test -p dar-sellami-integration-tests
//!
//! # Against running servers and a migrated database
//! cargo test -p dar-sellami-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `order_submission` - Cart to order, with fake persistence and notifier
//! - `admin_session` - Admin auth routes over an in-memory session store
//! - `live_servers` - HTTP against running storefront and admin servers
//!
//! This library holds the fakes the test files share.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use dar_sellami_admin::db::RepositoryError as AdminRepositoryError;
use dar_sellami_admin::models::AdminAccount;
use dar_sellami_admin::services::auth::AdminAccountStore;
use dar_sellami_core::{NewOrder, OrderId, OrderNotification, Price, ProductId};
use dar_sellami_storefront::db::RepositoryError;
use dar_sellami_storefront::models::Product;
use dar_sellami_storefront::services::catalog::Catalog;
use dar_sellami_storefront::services::checkout::OrderStore;
use dar_sellami_storefront::services::notifier::{NotifyError, NotifyResponse, OrderNotifier};

/// A menu product.
#[must_use]
pub fn product(id: &str, name: &str, cents: i64) -> Product {
    Product {
        id: ProductId::from(id),
        name: name.to_owned(),
        price: Price::from_cents(cents),
        description: None,
    }
}

/// Catalog serving a fixed menu.
pub struct FixedCatalog(pub Vec<Product>);

#[async_trait]
impl Catalog for FixedCatalog {
    async fn fetch_products(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.0.clone())
    }
}

/// How [`RecordingOrders`] answers an insert.
#[derive(Debug, Clone)]
pub enum InsertResult {
    Id(i32),
    NoId,
    Fail(String),
}

/// Order store that records what it was asked to insert.
pub struct RecordingOrders {
    result: InsertResult,
    inserted: Mutex<Vec<NewOrder>>,
}

impl RecordingOrders {
    #[must_use]
    pub const fn new(result: InsertResult) -> Self {
        Self {
            result,
            inserted: Mutex::new(Vec::new()),
        }
    }

    /// Orders received so far, including ones the store then failed.
    #[must_use]
    pub fn inserted(&self) -> Vec<NewOrder> {
        self.inserted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl OrderStore for RecordingOrders {
    async fn insert_order(&self, order: &NewOrder) -> Result<Option<OrderId>, RepositoryError> {
        self.inserted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(order.clone());

        match &self.result {
            InsertResult::Id(id) => Ok(Some(OrderId::new(*id))),
            InsertResult::NoId => Ok(None),
            InsertResult::Fail(message) => Err(RepositoryError::Conflict(message.clone())),
        }
    }
}

/// Notifier that counts calls and answers with a fixed response, or fails
/// with a fixed HTTP status.
pub struct CountingNotifier {
    response: Result<NotifyResponse, u16>,
    calls: AtomicUsize,
    last: Mutex<Option<OrderNotification>>,
}

impl CountingNotifier {
    #[must_use]
    pub const fn new(response: NotifyResponse) -> Self {
        Self::with_result(Ok(response))
    }

    /// A notifier whose endpoint always answers `status`.
    #[must_use]
    pub const fn failing(status: u16) -> Self {
        Self::with_result(Err(status))
    }

    const fn with_result(response: Result<NotifyResponse, u16>) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent notification sent.
    #[must_use]
    pub fn last(&self) -> Option<OrderNotification> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl OrderNotifier for CountingNotifier {
    async fn send_order_confirmation(
        &self,
        details: &OrderNotification,
    ) -> Result<NotifyResponse, NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(details.clone());
        self.response
            .clone()
            .map_err(|status| NotifyError::UnexpectedResponse { status })
    }
}

/// Admin accounts held in memory, matched the way the database matches them.
pub struct InMemoryAccounts(pub Vec<AdminAccount>);

#[async_trait]
impl AdminAccountStore for InMemoryAccounts {
    async fn lookup_active(&self, email: &str) -> Result<Vec<AdminAccount>, AdminRepositoryError> {
        Ok(self
            .0
            .iter()
            .filter(|a| a.is_active && a.email.eq_ignore_ascii_case(email.trim()))
            .cloned()
            .collect())
    }
}
