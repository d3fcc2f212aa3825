//! The customer's cart.
//!
//! [`CartLedger`] is the committed product → quantity mapping and the only
//! part that is ever persisted. [`PendingEdits`] holds raw text the customer
//! is still typing into a quantity field, so that an intermediate keystroke
//! (an empty field while retyping, a stray letter) never reaches the ledger.
//! [`Cart`] combines the two and exposes the operations the storefront calls.
//!
//! Invariant: a ledger quantity is always `> 0`. Every path that would store
//! zero or less removes the key instead.

pub mod codec;

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// Committed cart contents: product id → quantity (always positive).
///
/// Serializes as a JSON object (`{"<product id>": <quantity>}`), the shape
/// stored under the `cart` storage key. Deserializing drops entries whose
/// quantity is not positive or whose id is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<ProductId, i64>")]
pub struct CartLedger {
    entries: BTreeMap<ProductId, u32>,
}

impl Serialize for CartLedger {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl From<BTreeMap<ProductId, i64>> for CartLedger {
    fn from(raw: BTreeMap<ProductId, i64>) -> Self {
        raw.into_iter()
            .filter_map(|(id, qty)| positive_quantity(qty).map(|q| (id, q)))
            .filter(|(id, _)| !id.is_empty())
            .collect()
    }
}

impl FromIterator<(ProductId, u32)> for CartLedger {
    fn from_iter<I: IntoIterator<Item = (ProductId, u32)>>(iter: I) -> Self {
        let mut ledger = Self::default();
        for (id, qty) in iter {
            ledger.set(id, qty);
        }
        ledger
    }
}

impl CartLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed quantity for a product, if it is in the cart.
    #[must_use]
    pub fn quantity(&self, id: &ProductId) -> Option<u32> {
        self.entries.get(id).copied()
    }

    /// Whether the product is in the cart.
    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cart has no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all quantities (the badge count). Recomputed on every call.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.entries.values().map(|&q| u64::from(q)).sum()
    }

    /// Iterate entries in product id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ProductId, u32)> {
        self.entries.iter().map(|(id, &q)| (id, q))
    }

    /// Product ids in the cart, in id order.
    pub fn product_ids(&self) -> impl Iterator<Item = &ProductId> {
        self.entries.keys()
    }

    /// Set a quantity; zero removes the entry.
    fn set(&mut self, id: ProductId, quantity: u32) {
        if quantity == 0 || id.is_empty() {
            self.entries.remove(&id);
        } else {
            self.entries.insert(id, quantity);
        }
    }

    fn remove(&mut self, id: &ProductId) -> bool {
        self.entries.remove(id).is_some()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// In-progress quantity edits: product id → raw field text.
///
/// A key exists only while the customer is editing that product's field.
/// Never written under the cart key; the storefront keeps it in the session
/// only for the length of the edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingEdits {
    edits: BTreeMap<ProductId, String>,
}

impl PendingEdits {
    /// Raw text being edited for a product.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&str> {
        self.edits.get(id).map(String::as_str)
    }

    /// Whether any edit is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    fn hold(&mut self, id: ProductId, raw: String) {
        self.edits.insert(id, raw);
    }

    fn resolve(&mut self, id: &ProductId) -> bool {
        self.edits.remove(id).is_some()
    }

    fn clear(&mut self) {
        self.edits.clear();
    }
}

/// Result of [`Cart::set_quantity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuantityEdit {
    /// The text did not parse; held as a pending edit, ledger untouched.
    Pending(String),
    /// The ledger now holds this quantity.
    Committed(u32),
    /// The parsed value was zero or negative; the product was removed.
    Removed,
}

impl QuantityEdit {
    /// Whether the committed ledger changed (and so must be persisted).
    #[must_use]
    pub const fn touches_ledger(&self) -> bool {
        !matches!(self, Self::Pending(_))
    }
}

/// A cart: committed ledger plus pending quantity edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    ledger: CartLedger,
    pending: PendingEdits,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a ledger restored from storage or the URL; no edits are open.
    #[must_use]
    pub fn from_ledger(ledger: CartLedger) -> Self {
        Self {
            ledger,
            pending: PendingEdits::default(),
        }
    }

    /// Reassemble a cart from a stored ledger and the open edits.
    #[must_use]
    pub const fn from_parts(ledger: CartLedger, pending: PendingEdits) -> Self {
        Self { ledger, pending }
    }

    /// The committed contents.
    #[must_use]
    pub const fn ledger(&self) -> &CartLedger {
        &self.ledger
    }

    /// Open quantity edits.
    #[must_use]
    pub const fn pending(&self) -> &PendingEdits {
        &self.pending
    }

    /// Add `quantity` units of a product.
    ///
    /// Non-positive input is ignored. Returns whether the ledger changed.
    pub fn add(&mut self, id: ProductId, quantity: i64) -> bool {
        let Some(quantity) = positive_quantity(quantity) else {
            return false;
        };
        if id.is_empty() {
            return false;
        }
        let current = self.ledger.quantity(&id).unwrap_or(0);
        self.ledger.set(id, current.saturating_add(quantity));
        true
    }

    /// Step a product's quantity up by one (adds it if absent).
    pub fn increment(&mut self, id: ProductId) -> bool {
        self.add(id, 1)
    }

    /// Step a product's quantity down by one.
    ///
    /// A quantity of one is removed rather than stored as zero. Returns
    /// whether the ledger changed.
    pub fn decrement(&mut self, id: &ProductId) -> bool {
        match self.ledger.quantity(id) {
            Some(1) => self.remove(id),
            Some(q) => {
                self.ledger.set(id.clone(), q - 1);
                true
            }
            None => false,
        }
    }

    /// Apply raw text typed into a product's quantity field.
    ///
    /// Text that does not parse as an integer is held as a pending edit and
    /// the committed quantity is left alone. A parsed value `<= 0` removes
    /// the product, a positive value replaces its quantity; either way the
    /// pending edit is cleared.
    pub fn set_quantity(&mut self, id: ProductId, raw: &str) -> QuantityEdit {
        let Some(value) = parse_quantity(raw) else {
            self.pending.hold(id, raw.to_owned());
            return QuantityEdit::Pending(raw.to_owned());
        };

        self.pending.resolve(&id);
        match positive_quantity(value) {
            Some(quantity) => {
                self.ledger.set(id, quantity);
                QuantityEdit::Committed(quantity)
            }
            None => {
                self.ledger.remove(&id);
                QuantityEdit::Removed
            }
        }
    }

    /// The quantity field lost focus: drop any pending text so the field
    /// shows the committed quantity again. Returns whether an edit was open.
    pub fn end_edit(&mut self, id: &ProductId) -> bool {
        self.pending.resolve(id)
    }

    /// Remove a product and any pending edit for it.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        self.pending.resolve(id);
        self.ledger.remove(id)
    }

    /// Empty the ledger and the pending edits.
    pub fn clear(&mut self) {
        self.ledger.clear();
        self.pending.clear();
    }

    /// Replace the committed contents (e.g. from a cart URL), closing edits.
    pub fn replace(&mut self, ledger: CartLedger) {
        self.ledger = ledger;
        self.pending.clear();
    }

    /// Sum of committed quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.ledger.total_items()
    }

    /// Whether the committed ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    /// Text to show in a product's quantity field: the pending raw text while
    /// an edit is open, otherwise the committed quantity.
    #[must_use]
    pub fn display_quantity(&self, id: &ProductId) -> Option<Cow<'_, str>> {
        if let Some(raw) = self.pending.get(id) {
            return Some(Cow::Borrowed(raw));
        }
        self.ledger
            .quantity(id)
            .map(|q| Cow::Owned(q.to_string()))
    }
}

/// Clamp a parsed integer into a stored quantity; `None` when not positive.
fn positive_quantity(value: i64) -> Option<u32> {
    if value <= 0 {
        return None;
    }
    Some(u32::try_from(value).unwrap_or(u32::MAX))
}

/// Parse the leading integer of a quantity field.
///
/// Leading whitespace and a sign are accepted, and parsing stops at the first
/// non-digit, so `"3 "` and `"3x"` read as 3. Text with no leading digits
/// (`""`, `"abc"`, `"-"`) does not parse. Values beyond `i64` saturate.
#[must_use]
pub fn parse_quantity(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    let leading = digits.get(..end).filter(|d| !d.is_empty())?;
    let magnitude = leading.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
