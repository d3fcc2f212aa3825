//! Order submission.
//!
//! An [`OrderSubmission`] walks one checkout through
//! `Idle → Submitting → Succeeded | Failed`:
//!
//! 1. An empty cart is rejected before the store is touched.
//! 2. The order is assembled and inserted. A store failure ends the
//!    submission with the store's message; the cart is kept for a retry.
//! 3. If the store returns no id, notification is skipped and the order is
//!    reported as placed without an id.
//! 4. Otherwise the notifier is called. Its failure is logged and reported in
//!    the outcome but never fails the order.
//! 5. On any success the stored cart is cleared and the success continuation
//!    runs.
//!
//! Nothing here de-duplicates orders: two submits make two orders.
//! [`SubmitGuard`] keeps a session from running two submissions at once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use dar_sellami_core::{
    AssembleError, CustomerDetails, Email, FulfillmentSelection, KeyValueStore, NewOrder, OrderId,
    OrderItem, Price, assemble,
};

use crate::db::RepositoryError;
use crate::services::cart::CartService;
use crate::services::notifier::OrderNotifier;

/// Append-only order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert an order; the store assigns the id.
    ///
    /// `Ok(None)` means the insert succeeded but no id came back.
    async fn insert_order(&self, order: &NewOrder) -> Result<Option<OrderId>, RepositoryError>;
}

/// Why a submission did not place an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Nothing to order.
    #[error("Your cart is empty")]
    EmptyCart,

    /// The checkout form is incomplete.
    #[error("{0}")]
    InvalidForm(String),

    /// The store rejected the order; carries its message unchanged.
    #[error("Error placing order: {0}")]
    Persist(String),

    /// Another submission from this session is still running.
    #[error("Your order is already being submitted")]
    AlreadySubmitting,
}

impl SubmitError {
    /// Stable code for clients and tests.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyCart => "empty_cart",
            Self::InvalidForm(_) => "invalid_form",
            Self::Persist(_) => "persist_failed",
            Self::AlreadySubmitting => "already_submitting",
        }
    }
}

impl From<AssembleError> for SubmitError {
    fn from(err: AssembleError) -> Self {
        match err {
            AssembleError::EmptyCart => Self::EmptyCart,
            other => Self::InvalidForm(other.to_string()),
        }
    }
}

/// How a successful submission went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Stored and notified.
    Placed { order_id: OrderId, total: Price },
    /// Stored, but the store returned no id; nobody was notified.
    PlacedWithoutId { total: Price },
    /// Stored, but the confirmation could not be sent.
    PlacedNotificationFailed {
        order_id: OrderId,
        total: Price,
        reason: String,
    },
}

impl SubmissionOutcome {
    /// Stable code for clients and tests.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "placed",
            Self::PlacedWithoutId { .. } => "placed_without_id",
            Self::PlacedNotificationFailed { .. } => "placed_notification_failed",
        }
    }

    /// The stored order's id, when known.
    #[must_use]
    pub const fn order_id(&self) -> Option<OrderId> {
        match self {
            Self::Placed { order_id, .. } | Self::PlacedNotificationFailed { order_id, .. } => {
                Some(*order_id)
            }
            Self::PlacedWithoutId { .. } => None,
        }
    }

    /// Order total.
    #[must_use]
    pub const fn total(&self) -> Price {
        match self {
            Self::Placed { total, .. }
            | Self::PlacedWithoutId { total }
            | Self::PlacedNotificationFailed { total, .. } => *total,
        }
    }

    /// Message for the customer.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Placed { order_id, .. } => {
                format!("Order #{order_id} placed successfully! A confirmation email is on its way.")
            }
            Self::PlacedWithoutId { .. } => {
                "Order placed successfully, but we could not retrieve your order number. \
                 The restaurant has your order."
                    .to_owned()
            }
            Self::PlacedNotificationFailed { order_id, .. } => format!(
                "Order #{order_id} placed successfully! We could not send your confirmation email."
            ),
        }
    }
}

/// Where a submission is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Succeeded(SubmissionOutcome),
    Failed(SubmitError),
}

/// JSON body returned by `POST /checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReport {
    pub success: bool,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Price>,
}

impl From<&SubmissionOutcome> for SubmissionReport {
    fn from(outcome: &SubmissionOutcome) -> Self {
        Self {
            success: true,
            code: outcome.code(),
            message: outcome.message(),
            order_id: outcome.order_id(),
            total: Some(outcome.total()),
        }
    }
}

impl From<&SubmitError> for SubmissionReport {
    fn from(err: &SubmitError) -> Self {
        Self {
            success: false,
            code: err.code(),
            message: err.to_string(),
            order_id: None,
            total: None,
        }
    }
}

/// One checkout attempt over injected collaborators.
pub struct OrderSubmission<'a, O: ?Sized, N: ?Sized, S: ?Sized> {
    orders: &'a O,
    notifier: &'a N,
    storage: &'a S,
    delivery_fee: Price,
    state: SubmissionState,
}

impl<'a, O, N, S> OrderSubmission<'a, O, N, S>
where
    O: OrderStore + ?Sized,
    N: OrderNotifier + ?Sized,
    S: KeyValueStore + ?Sized,
{
    /// Prepare a submission. `storage` holds the customer's cart.
    #[must_use]
    pub const fn new(orders: &'a O, notifier: &'a N, storage: &'a S, delivery_fee: Price) -> Self {
        Self {
            orders,
            notifier,
            storage,
            delivery_fee,
            state: SubmissionState::Idle,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Run the submission.
    ///
    /// `on_success` runs once, after the cart is cleared, for every kind of
    /// success.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] when no order was placed.
    #[instrument(skip_all, fields(delivery_type = %fulfillment.delivery_type(), items = items.len()))]
    pub async fn submit(
        &mut self,
        items: Vec<OrderItem>,
        fulfillment: FulfillmentSelection,
        on_success: impl FnOnce(&SubmissionOutcome) + Send,
    ) -> Result<SubmissionOutcome, SubmitError> {
        self.state = SubmissionState::Submitting;
        match self.run(items, fulfillment).await {
            Ok(outcome) => {
                self.clear_cart().await;
                on_success(&outcome);
                self.state = SubmissionState::Succeeded(outcome.clone());
                Ok(outcome)
            }
            Err(err) => {
                self.state = SubmissionState::Failed(err.clone());
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        items: Vec<OrderItem>,
        fulfillment: FulfillmentSelection,
    ) -> Result<SubmissionOutcome, SubmitError> {
        if items.is_empty() {
            return Err(SubmitError::EmptyCart);
        }

        let assembled = assemble(items, fulfillment, self.delivery_fee)?;
        let total = assembled.totals().total;

        let order_id = match self.orders.insert_order(&assembled.record).await {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "Order insert failed");
                return Err(SubmitError::Persist(store_message(&e)));
            }
        };

        let Some(order_id) = order_id else {
            warn!("Order stored but no id returned; skipping notification");
            return Ok(SubmissionOutcome::PlacedWithoutId { total });
        };
        info!(%order_id, %total, "Order stored");

        let notification = assembled.notification.with_order_id(order_id);
        let reason = match self.notifier.send_order_confirmation(&notification).await {
            Ok(response) if response.success => None,
            Ok(response) => Some(
                response
                    .message
                    .unwrap_or_else(|| "notification endpoint reported failure".to_owned()),
            ),
            Err(e) => Some(e.to_string()),
        };

        Ok(match reason {
            None => SubmissionOutcome::Placed { order_id, total },
            Some(reason) => {
                warn!(%order_id, %reason, "Order confirmation not sent");
                SubmissionOutcome::PlacedNotificationFailed {
                    order_id,
                    total,
                    reason,
                }
            }
        })
    }

    async fn clear_cart(&self) {
        if let Err(e) = CartService::new(self.storage).clear().await {
            error!(error = %e, "Order placed but cart could not be cleared");
        }
    }
}

/// The store's own message for a failed insert.
fn store_message(err: &RepositoryError) -> String {
    match err {
        RepositoryError::Database(sqlx::Error::Database(db)) => db.message().to_owned(),
        other => other.to_string(),
    }
}

/// Tracks which sessions have a submission in flight.
#[derive(Debug, Clone, Default)]
pub struct SubmitGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl SubmitGuard {
    /// Create an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as submitting. `None` if it already is.
    #[must_use]
    pub fn try_begin(&self, key: &str) -> Option<SubmitTicket> {
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned());
        inserted.then(|| SubmitTicket {
            in_flight: Arc::clone(&self.in_flight),
            key: key.to_owned(),
        })
    }
}

/// Held for the duration of a submission; releases the session on drop.
#[derive(Debug)]
pub struct SubmitTicket {
    in_flight: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for SubmitTicket {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// The checkout form as posted: one flat set of fields for both variants.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    pub delivery_type: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub governorate: String,
    #[serde(default)]
    pub pickup_time: String,
    #[serde(default)]
    pub notes: String,
}

impl CheckoutForm {
    /// Build the fulfillment selection, keeping only the chosen variant's
    /// fields.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::InvalidForm` for an unknown delivery type, a
    /// blank required field, or an unusable email address.
    pub fn into_selection(self) -> Result<FulfillmentSelection, SubmitError> {
        let delivery_type = self
            .delivery_type
            .parse::<dar_sellami_core::DeliveryType>()
            .map_err(SubmitError::InvalidForm)?;

        for (label, value) in [
            ("First name", &self.first_name),
            ("Last name", &self.last_name),
            ("Phone", &self.phone),
            ("Email", &self.email),
        ] {
            if value.trim().is_empty() {
                return Err(SubmitError::InvalidForm(format!("{label} is required")));
            }
        }
        let email = Email::parse(&self.email)
            .map_err(|e| SubmitError::InvalidForm(format!("Invalid email: {e}")))?;

        let customer = CustomerDetails {
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            email,
        };

        let selection = match delivery_type {
            dar_sellami_core::DeliveryType::Delivery => FulfillmentSelection::Delivery {
                customer,
                address: self.address.trim().to_owned(),
                governorate: self.governorate.trim().to_owned(),
            },
            dar_sellami_core::DeliveryType::Pickup => FulfillmentSelection::Pickup {
                customer,
                pickup_time: self.pickup_time.trim().to_owned(),
                notes: Some(self.notes.trim().to_owned()).filter(|n| !n.is_empty()),
            },
        };
        Ok(selection)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(delivery_type: &str) -> CheckoutForm {
        CheckoutForm {
            delivery_type: delivery_type.to_owned(),
            first_name: "Sami".to_owned(),
            last_name: "Trabelsi".to_owned(),
            phone: "22 333 444".to_owned(),
            email: "sami@example.tn".to_owned(),
            address: "5 Avenue Habib Bourguiba".to_owned(),
            governorate: "Sousse".to_owned(),
            pickup_time: "20:00".to_owned(),
            notes: "extra harissa".to_owned(),
        }
    }

    #[test]
    fn test_delivery_form_drops_pickup_fields() {
        let selection = form("delivery").into_selection().unwrap();
        let FulfillmentSelection::Delivery { address, .. } = selection else {
            panic!("expected delivery");
        };
        assert_eq!(address, "5 Avenue Habib Bourguiba");
    }

    #[test]
    fn test_pickup_form_keeps_notes() {
        let selection = form("pickup").into_selection().unwrap();
        let FulfillmentSelection::Pickup { notes, .. } = selection else {
            panic!("expected pickup");
        };
        assert_eq!(notes.as_deref(), Some("extra harissa"));
    }

    #[test]
    fn test_form_requires_email() {
        let mut f = form("pickup");
        f.email = " ".to_owned();
        let err = f.into_selection().unwrap_err();
        assert_eq!(err, SubmitError::InvalidForm("Email is required".to_owned()));
        assert_eq!(err.code(), "invalid_form");
    }

    #[test]
    fn test_form_rejects_unknown_delivery_type() {
        assert!(form("drone").into_selection().is_err());
    }

    #[test]
    fn test_submit_guard_blocks_second_submit() {
        let guard = SubmitGuard::new();
        let ticket = guard.try_begin("session-1").unwrap();
        assert!(guard.try_begin("session-1").is_none());
        assert!(guard.try_begin("session-2").is_some());
        drop(ticket);
        assert!(guard.try_begin("session-1").is_some());
    }

    #[test]
    fn test_report_codes() {
        let outcome = SubmissionOutcome::PlacedWithoutId {
            total: Price::from_cents(2500),
        };
        let report = SubmissionReport::from(&outcome);
        assert!(report.success);
        assert_eq!(report.code, "placed_without_id");
        assert!(report.order_id.is_none());

        let report = SubmissionReport::from(&SubmitError::Persist("duplicate key".to_owned()));
        assert!(!report.success);
        assert_eq!(report.code, "persist_failed");
        assert_eq!(report.message, "Error placing order: duplicate key");
    }
}
