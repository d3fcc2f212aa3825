//! Order assembly.
//!
//! [`assemble`] turns the cart's priced items and the customer's fulfillment
//! choice into two views of the same order: the [`NewOrder`] record handed to
//! the order store and the [`OrderNotification`] handed to the mailer. Both
//! carry the one [`OrderTotals`] computed here, so the persisted total and the
//! mailed total cannot drift apart.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DeliveryType, Email, OrderId, Price, ProductId};

/// Delivery fee charged when no other amount is configured.
pub const DEFAULT_DELIVERY_FEE: Price = Price::new(Decimal::from_parts(800, 0, 0, false, 2));

/// Errors from [`assemble`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    /// No items to order.
    #[error("Your cart is empty")]
    EmptyCart,
    /// A required customer field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// An item has a zero quantity.
    #[error("Item {0} has no quantity")]
    ZeroQuantity(ProductId),
    /// An item or fee carries a negative amount.
    #[error("Negative amount for {0}")]
    NegativeAmount(String),
}

/// One ordered line: the catalog facts at the time of ordering.
///
/// The same shape is stored in the order's `items` column and rendered in the
/// notification mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Catalog product id.
    #[serde(rename = "id")]
    pub product_id: ProductId,
    /// Product name as shown on the menu.
    pub name: String,
    /// Price of one unit.
    #[serde(rename = "price")]
    pub unit_price: Price,
    /// Units ordered.
    pub quantity: u32,
}

impl OrderItem {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// Contact fields common to both fulfillment variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: Email,
}

impl CustomerDetails {
    /// "First Last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// How the customer receives the order. Exactly one variant per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "deliveryType", rename_all = "lowercase")]
pub enum FulfillmentSelection {
    /// Brought to the customer's address.
    Delivery {
        #[serde(flatten)]
        customer: CustomerDetails,
        address: String,
        governorate: String,
    },
    /// Collected at the restaurant.
    Pickup {
        #[serde(flatten)]
        customer: CustomerDetails,
        #[serde(rename = "pickupTime")]
        pickup_time: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
}

impl FulfillmentSelection {
    /// The variant's discriminator.
    #[must_use]
    pub const fn delivery_type(&self) -> DeliveryType {
        match self {
            Self::Delivery { .. } => DeliveryType::Delivery,
            Self::Pickup { .. } => DeliveryType::Pickup,
        }
    }

    /// Contact details of the customer.
    #[must_use]
    pub const fn customer(&self) -> &CustomerDetails {
        match self {
            Self::Delivery { customer, .. } | Self::Pickup { customer, .. } => customer,
        }
    }

    fn check_required(&self) -> Result<(), AssembleError> {
        let customer = self.customer();
        require("First name", &customer.first_name)?;
        require("Last name", &customer.last_name)?;
        require("Phone", &customer.phone)?;
        match self {
            Self::Delivery {
                address,
                governorate,
                ..
            } => {
                require("Address", address)?;
                require("Governorate", governorate)
            }
            Self::Pickup { pickup_time, .. } => require("Pickup time", pickup_time),
        }
    }
}

fn require(field: &'static str, value: &str) -> Result<(), AssembleError> {
    if value.trim().is_empty() {
        Err(AssembleError::MissingField(field))
    } else {
        Ok(())
    }
}

/// Subtotal, fee and total of one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Price,
    pub delivery_fee: Price,
    pub total: Price,
}

impl OrderTotals {
    /// Compute totals: the fee applies to delivery only.
    #[must_use]
    pub fn compute(items: &[OrderItem], delivery_type: DeliveryType, delivery_fee: Price) -> Self {
        let subtotal: Price = items.iter().map(OrderItem::line_total).sum();
        let delivery_fee = match delivery_type {
            DeliveryType::Delivery => delivery_fee,
            DeliveryType::Pickup => Price::ZERO,
        };
        Self {
            subtotal,
            delivery_fee,
            total: subtotal + delivery_fee,
        }
    }
}

/// The persistable shape of an order, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: Email,
    pub delivery_type: DeliveryType,
    pub address: Option<String>,
    pub governorate: Option<String>,
    pub pickup_time: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
    #[serde(flatten)]
    pub totals: OrderTotals,
}

/// What the mailer needs to render the customer and operator messages.
///
/// Serialized as the `orderDetails` object of the notification endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotification {
    /// Store-assigned id; set once the order has been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    pub first_name: String,
    pub last_name: String,
    /// Confirmation recipient. Absent only in payloads built by other clients.
    #[serde(default)]
    pub email: Option<Email>,
    pub phone: String,
    pub delivery_type: DeliveryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governorate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
    #[serde(flatten)]
    pub totals: OrderTotals,
}

impl OrderNotification {
    /// Attach the id the store assigned.
    #[must_use]
    pub const fn with_order_id(mut self, id: OrderId) -> Self {
        self.order_id = Some(id);
        self
    }

    /// "First Last".
    #[must_use]
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Id as shown in subjects, or `"pending"` before persistence.
    #[must_use]
    pub fn order_reference(&self) -> String {
        self.order_id
            .map_or_else(|| "pending".to_owned(), |id| id.to_string())
    }
}

/// Output of [`assemble`]: the record to persist and the message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledOrder {
    pub record: NewOrder,
    pub notification: OrderNotification,
}

impl AssembledOrder {
    /// Totals shared by the record and the notification.
    #[must_use]
    pub const fn totals(&self) -> &OrderTotals {
        &self.record.totals
    }
}

/// Build the persistable record and the notification payload for an order.
///
/// `items` must be non-empty with positive quantities and non-negative
/// prices; the fulfillment's required fields must be non-blank. The fee is
/// charged only for [`FulfillmentSelection::Delivery`].
///
/// # Errors
///
/// Returns [`AssembleError`] when any of the above does not hold.
pub fn assemble(
    items: Vec<OrderItem>,
    fulfillment: FulfillmentSelection,
    delivery_fee: Price,
) -> Result<AssembledOrder, AssembleError> {
    if items.is_empty() {
        return Err(AssembleError::EmptyCart);
    }
    if delivery_fee.is_negative() {
        return Err(AssembleError::NegativeAmount("delivery fee".to_owned()));
    }
    for item in &items {
        if item.quantity == 0 {
            return Err(AssembleError::ZeroQuantity(item.product_id.clone()));
        }
        if item.unit_price.is_negative() {
            return Err(AssembleError::NegativeAmount(item.name.clone()));
        }
    }
    fulfillment.check_required()?;

    let delivery_type = fulfillment.delivery_type();
    let totals = OrderTotals::compute(&items, delivery_type, delivery_fee);

    let (customer, address, governorate, pickup_time, notes) = match fulfillment {
        FulfillmentSelection::Delivery {
            customer,
            address,
            governorate,
        } => (customer, Some(address), Some(governorate), None, None),
        FulfillmentSelection::Pickup {
            customer,
            pickup_time,
            notes,
        } => {
            let notes = notes.filter(|n| !n.trim().is_empty());
            (customer, None, None, Some(pickup_time), notes)
        }
    };

    let notification = OrderNotification {
        order_id: None,
        first_name: customer.first_name.clone(),
        last_name: customer.last_name.clone(),
        email: Some(customer.email.clone()),
        phone: customer.phone.clone(),
        delivery_type,
        address: address.clone(),
        governorate: governorate.clone(),
        pickup_time: pickup_time.clone(),
        notes: notes.clone(),
        items: items.clone(),
        totals,
    };

    let record = NewOrder {
        first_name: customer.first_name,
        last_name: customer.last_name,
        phone: customer.phone,
        email: customer.email,
        delivery_type,
        address,
        governorate,
        pickup_time,
        notes,
        items,
        totals,
    };

    Ok(AssembledOrder {
        record,
        notification,
    })
}

/// A persisted order as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub delivery_type: DeliveryType,
    pub address: Option<String>,
    pub governorate: Option<String>,
    pub pickup_time: Option<String>,
    pub notes: Option<String>,
    #[cfg_attr(feature = "postgres", sqlx(json))]
    pub items: Vec<OrderItem>,
    #[serde(flatten)]
    #[cfg_attr(feature = "postgres", sqlx(flatten))]
    pub totals: OrderTotals,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// "First Last".
    #[must_use]
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Sum of item quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

/// Dashboard counters over a set of orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: usize,
    pub delivery_orders: usize,
    pub pickup_orders: usize,
    pub total_revenue: Price,
}

impl OrderStats {
    /// Tally orders by fulfillment type and sum their persisted totals.
    #[must_use]
    pub fn tally(orders: &[Order]) -> Self {
        orders.iter().fold(Self::default(), |mut stats, order| {
            stats.total_orders += 1;
            match order.delivery_type {
                DeliveryType::Delivery => stats.delivery_orders += 1,
                DeliveryType::Pickup => stats.pickup_orders += 1,
            }
            stats.total_revenue = stats.total_revenue + order.totals.total;
            stats
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: &str, cents: i64, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: ProductId::from(id),
            name: format!("Dish {id}"),
            unit_price: Price::from_cents(cents),
            quantity,
        }
    }

    fn customer() -> CustomerDetails {
        CustomerDetails {
            first_name: "Amira".to_owned(),
            last_name: "Ben Salah".to_owned(),
            phone: "+216 20 000 000".to_owned(),
            email: Email::parse("amira@example.tn").unwrap(),
        }
    }

    fn pickup() -> FulfillmentSelection {
        FulfillmentSelection::Pickup {
            customer: customer(),
            pickup_time: "19:30".to_owned(),
            notes: None,
        }
    }

    fn delivery() -> FulfillmentSelection {
        FulfillmentSelection::Delivery {
            customer: customer(),
            address: "12 Rue de Marseille".to_owned(),
            governorate: "Tunis".to_owned(),
        }
    }

    fn sample_items() -> Vec<OrderItem> {
        vec![item("A", 1000, 2), item("B", 500, 1)]
    }

    #[test]
    fn test_pickup_has_no_fee() {
        let order = assemble(sample_items(), pickup(), DEFAULT_DELIVERY_FEE).unwrap();
        let totals = order.totals();
        assert_eq!(totals.subtotal, Price::from_cents(2500));
        assert_eq!(totals.delivery_fee, Price::ZERO);
        assert_eq!(totals.total, Price::from_cents(2500));
    }

    #[test]
    fn test_delivery_adds_fee() {
        let order = assemble(sample_items(), delivery(), DEFAULT_DELIVERY_FEE).unwrap();
        let totals = order.totals();
        assert_eq!(totals.delivery_fee, Price::from_cents(800));
        assert_eq!(totals.total, Price::from_cents(3300));
        assert_eq!(totals.total.display(), "$33.00");
    }

    #[test]
    fn test_record_and_notification_share_totals() {
        for fulfillment in [pickup(), delivery()] {
            let order = assemble(sample_items(), fulfillment, Price::from_cents(350)).unwrap();
            assert_eq!(order.record.totals, order.notification.totals);
            assert_eq!(order.record.items, order.notification.items);
            let t = order.record.totals;
            assert_eq!(t.total, t.subtotal + t.delivery_fee);
        }
    }

    #[test]
    fn test_empty_items_rejected() {
        let err = assemble(Vec::new(), pickup(), DEFAULT_DELIVERY_FEE).unwrap_err();
        assert_eq!(err, AssembleError::EmptyCart);
    }

    #[test]
    fn test_blank_required_field_rejected() {
        let fulfillment = FulfillmentSelection::Delivery {
            customer: customer(),
            address: "   ".to_owned(),
            governorate: "Sfax".to_owned(),
        };
        let err = assemble(sample_items(), fulfillment, DEFAULT_DELIVERY_FEE).unwrap_err();
        assert_eq!(err, AssembleError::MissingField("Address"));
    }

    #[test]
    fn test_delivery_record_is_flattened() {
        let order = assemble(sample_items(), delivery(), DEFAULT_DELIVERY_FEE).unwrap();
        assert_eq!(order.record.delivery_type, DeliveryType::Delivery);
        assert_eq!(order.record.address.as_deref(), Some("12 Rue de Marseille"));
        assert!(order.record.pickup_time.is_none());
    }

    #[test]
    fn test_blank_pickup_notes_dropped() {
        let fulfillment = FulfillmentSelection::Pickup {
            customer: customer(),
            pickup_time: "12:00".to_owned(),
            notes: Some("  ".to_owned()),
        };
        let order = assemble(sample_items(), fulfillment, DEFAULT_DELIVERY_FEE).unwrap();
        assert!(order.record.notes.is_none());
    }

    #[test]
    fn test_notification_json_shape() {
        let order = assemble(sample_items(), pickup(), DEFAULT_DELIVERY_FEE).unwrap();
        let json = serde_json::to_value(order.notification.with_order_id(OrderId::new(42))).unwrap();
        assert_eq!(json["orderId"], 42);
        assert_eq!(json["deliveryType"], "pickup");
        assert_eq!(json["pickupTime"], "19:30");
        assert_eq!(json["total"], "25.00");
        assert_eq!(json["items"][0]["id"], "A");
        assert!(json.get("address").is_none());
    }

    #[test]
    fn test_stats_tally() {
        let make = |id: i32, delivery_type, cents| Order {
            id: OrderId::new(id),
            first_name: "A".to_owned(),
            last_name: "B".to_owned(),
            phone: "1".to_owned(),
            email: None,
            delivery_type,
            address: None,
            governorate: None,
            pickup_time: None,
            notes: None,
            items: Vec::new(),
            totals: OrderTotals {
                subtotal: Price::from_cents(cents),
                delivery_fee: Price::ZERO,
                total: Price::from_cents(cents),
            },
            created_at: Utc::now(),
        };
        let orders = vec![
            make(1, DeliveryType::Delivery, 3300),
            make(2, DeliveryType::Pickup, 2500),
            make(3, DeliveryType::Delivery, 1000),
        ];
        let stats = OrderStats::tally(&orders);
        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.delivery_orders, 2);
        assert_eq!(stats.pickup_orders, 1);
        assert_eq!(stats.total_revenue, Price::from_cents(6800));
    }
}
