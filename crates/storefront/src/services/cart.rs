//! Cart service: the cart ledger bound to durable storage.
//!
//! Every mutation loads the cart, applies the change, and writes it back
//! before returning. The committed ledger lives under the `cart` key as a
//! JSON object; open quantity edits live under a separate session key so that
//! a half-typed value is never mistaken for the committed quantity.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use dar_sellami_core::cart::codec;
use dar_sellami_core::storage::CART_KEY;
use dar_sellami_core::{
    Cart, CartLedger, KeyValueStore, OrderItem, PendingEdits, Price, ProductId, QuantityEdit,
    StorageError,
};

use crate::db::RepositoryError;
use crate::services::catalog::Catalog;

/// Session key for in-progress quantity edits.
pub const PENDING_EDITS_KEY: &str = "cartEdits";

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Durable storage failed.
    #[error("cart storage error: {0}")]
    Storage(#[from] StorageError),

    /// The catalog could not be read.
    #[error("catalog error: {0}")]
    Catalog(#[from] RepositoryError),
}

/// One cart line joined with catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
    pub line_total: Price,
    /// What the quantity field shows: pending text or the committed quantity.
    pub display_quantity: String,
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
        }
    }
}

/// What the cart page renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CartView {
    /// The ledger has items but product data is not available yet.
    Loading { total_items: u64 },
    /// Nothing to show.
    Empty,
    /// Items joined with the catalog.
    Ready {
        items: Vec<CartLine>,
        subtotal: Price,
        total_items: u64,
    },
}

impl CartView {
    /// Join a cart against catalog products.
    ///
    /// Products that are no longer on the menu are skipped.
    #[must_use]
    pub fn build(cart: &Cart, products: &[crate::models::Product]) -> Self {
        let items: Vec<CartLine> = products
            .iter()
            .filter_map(|product| {
                let quantity = cart.ledger().quantity(&product.id)?;
                let display_quantity = cart
                    .display_quantity(&product.id)
                    .map_or_else(|| quantity.to_string(), |d| d.into_owned());
                Some(CartLine {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    unit_price: product.price,
                    quantity,
                    line_total: product.price.times(quantity),
                    display_quantity,
                })
            })
            .collect();

        if items.is_empty() {
            return Self::Empty;
        }

        let subtotal = items.iter().map(|line| line.line_total).sum();
        let total_items = items.iter().map(|line| u64::from(line.quantity)).sum();
        Self::Ready {
            items,
            subtotal,
            total_items,
        }
    }

    /// Items in order form, or nothing unless the view is ready.
    #[must_use]
    pub fn order_items(&self) -> Vec<OrderItem> {
        match self {
            Self::Ready { items, .. } => items.iter().map(OrderItem::from).collect(),
            Self::Loading { .. } | Self::Empty => Vec::new(),
        }
    }
}

/// Cart operations over a [`KeyValueStore`].
pub struct CartService<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> CartService<'a, S> {
    /// Create a cart service over `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Load the cart.
    ///
    /// A stored value that is not a valid cart is purged and an empty cart
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store cannot be read.
    pub async fn load(&self) -> Result<Cart, CartError> {
        let ledger = match self.store.get(CART_KEY).await? {
            Some(raw) => match serde_json::from_str::<CartLedger>(&raw) {
                Ok(ledger) => ledger,
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable stored cart");
                    self.store.remove(CART_KEY).await?;
                    CartLedger::new()
                }
            },
            None => CartLedger::new(),
        };

        let pending = match self.store.get(PENDING_EDITS_KEY).await? {
            Some(raw) => serde_json::from_str::<PendingEdits>(&raw).unwrap_or_default(),
            None => PendingEdits::default(),
        };

        Ok(Cart::from_parts(ledger, pending))
    }

    /// Write the cart back.
    async fn save(&self, cart: &Cart) -> Result<(), CartError> {
        let ledger = serde_json::to_string(cart.ledger())
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        self.store.set(CART_KEY, ledger).await?;

        if cart.pending().is_empty() {
            self.store.remove(PENDING_EDITS_KEY).await?;
        } else {
            let pending = serde_json::to_string(cart.pending())
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            self.store.set(PENDING_EDITS_KEY, pending).await?;
        }
        debug!(total_items = cart.total_items(), "Cart saved");
        Ok(())
    }

    async fn mutate<T>(&self, change: impl FnOnce(&mut Cart) -> T) -> Result<(Cart, T), CartError> {
        let mut cart = self.load().await?;
        let outcome = change(&mut cart);
        self.save(&cart).await?;
        Ok((cart, outcome))
    }

    /// Add `quantity` units; non-positive quantities change nothing.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store fails.
    pub async fn add(&self, id: ProductId, quantity: i64) -> Result<Cart, CartError> {
        Ok(self.mutate(|cart| cart.add(id, quantity)).await?.0)
    }

    /// Step a quantity up by one.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store fails.
    pub async fn increment(&self, id: ProductId) -> Result<Cart, CartError> {
        Ok(self.mutate(|cart| cart.increment(id)).await?.0)
    }

    /// Step a quantity down by one; one becomes removal.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store fails.
    pub async fn decrement(&self, id: &ProductId) -> Result<Cart, CartError> {
        Ok(self.mutate(|cart| cart.decrement(id)).await?.0)
    }

    /// Apply raw quantity text.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store fails.
    pub async fn set_quantity(
        &self,
        id: ProductId,
        raw: &str,
    ) -> Result<(Cart, QuantityEdit), CartError> {
        self.mutate(|cart| cart.set_quantity(id, raw)).await
    }

    /// The quantity field lost focus.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store fails.
    pub async fn end_edit(&self, id: &ProductId) -> Result<Cart, CartError> {
        Ok(self.mutate(|cart| cart.end_edit(id)).await?.0)
    }

    /// Remove a product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store fails.
    pub async fn remove(&self, id: &ProductId) -> Result<Cart, CartError> {
        Ok(self.mutate(|cart| cart.remove(id)).await?.0)
    }

    /// Replace the cart with one decoded from the `cart` URL parameter.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store fails.
    pub async fn replace_from_url(&self, encoded: &str) -> Result<Cart, CartError> {
        let ledger = codec::decode(encoded);
        Ok(self.mutate(|cart| cart.replace(ledger)).await?.0)
    }

    /// Empty the cart and delete its stored copy.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store fails.
    pub async fn clear(&self) -> Result<(), CartError> {
        self.store.remove(CART_KEY).await?;
        self.store.remove(PENDING_EDITS_KEY).await?;
        debug!("Cart cleared");
        Ok(())
    }

    /// The cart joined with the catalog.
    ///
    /// When the catalog cannot be read the view is `Loading` rather than
    /// `Empty`, so a customer with items never sees an empty cart by mistake.
    pub async fn view<C: Catalog + ?Sized>(&self, cart: &Cart, catalog: &C) -> CartView {
        if cart.is_empty() {
            return CartView::Empty;
        }
        let ids: Vec<ProductId> = cart.ledger().product_ids().cloned().collect();
        match catalog.fetch_by_ids(&ids).await {
            Ok(products) => CartView::build(cart, &products),
            Err(e) => {
                warn!(error = %e, "Catalog unavailable while building cart view");
                CartView::Loading {
                    total_items: cart.total_items(),
                }
            }
        }
    }
}

/// Encode a cart for the `cart` URL parameter.
#[must_use]
pub fn share_link(base_url: &str, cart: &Cart) -> String {
    let encoded = codec::encode(cart.ledger());
    format!(
        "{}/cart?cart={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(&encoded)
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use dar_sellami_core::MemoryStore;

    use super::*;
    use crate::models::Product;

    struct FixedCatalog(Vec<Product>);

    #[async_trait]
    impl Catalog for FixedCatalog {
        async fn fetch_products(&self) -> Result<Vec<Product>, RepositoryError> {
            Ok(self.0.clone())
        }
    }

    struct DownCatalog;

    #[async_trait]
    impl Catalog for DownCatalog {
        async fn fetch_products(&self) -> Result<Vec<Product>, RepositoryError> {
            Err(RepositoryError::NotFound)
        }
    }

    fn product(id: &str, cents: i64) -> Product {
        Product {
            id: ProductId::from(id),
            name: format!("Dish {id}"),
            price: Price::from_cents(cents),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_mutations_persist() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);

        carts.add(ProductId::from("A"), 2).await.unwrap();
        carts.increment(ProductId::from("B")).await.unwrap();

        assert_eq!(store.peek(CART_KEY).as_deref(), Some(r#"{"A":2,"B":1}"#));
    }

    #[tokio::test]
    async fn test_unreadable_cart_is_purged() {
        let store = MemoryStore::new();
        store.seed(CART_KEY, "not json");
        let carts = CartService::new(&store);

        let cart = carts.load().await.unwrap();

        assert!(cart.is_empty());
        assert!(store.peek(CART_KEY).is_none());
    }

    #[tokio::test]
    async fn test_pending_edit_survives_between_requests() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        carts.add(ProductId::from("A"), 3).await.unwrap();

        let (_, edit) = carts.set_quantity(ProductId::from("A"), "").await.unwrap();
        assert_eq!(edit, QuantityEdit::Pending(String::new()));
        assert_eq!(store.peek(CART_KEY).as_deref(), Some(r#"{"A":3}"#));

        let cart = carts.load().await.unwrap();
        assert_eq!(cart.display_quantity(&ProductId::from("A")).unwrap(), "");

        let cart = carts.end_edit(&ProductId::from("A")).await.unwrap();
        assert_eq!(cart.display_quantity(&ProductId::from("A")).unwrap(), "3");
        assert!(store.peek(PENDING_EDITS_KEY).is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_stored_cart() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        carts.add(ProductId::from("A"), 1).await.unwrap();

        carts.clear().await.unwrap();

        assert!(store.peek(CART_KEY).is_none());
        assert!(carts.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_from_url() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        carts.add(ProductId::from("old"), 1).await.unwrap();

        let cart = carts.replace_from_url("A:2,B:1").await.unwrap();

        assert_eq!(cart.total_items(), 3);
        assert!(!cart.ledger().contains(&ProductId::from("old")));
    }

    #[tokio::test]
    async fn test_view_joins_catalog_and_skips_missing() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        carts.add(ProductId::from("A"), 2).await.unwrap();
        let cart = carts.add(ProductId::from("gone"), 1).await.unwrap();

        let catalog = FixedCatalog(vec![product("A", 1000), product("B", 500)]);
        let view = carts.view(&cart, &catalog).await;

        let CartView::Ready {
            items,
            subtotal,
            total_items,
        } = view
        else {
            panic!("expected ready view");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(subtotal, Price::from_cents(2000));
        assert_eq!(total_items, 2);
    }

    #[tokio::test]
    async fn test_view_loading_when_catalog_down() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let cart = carts.add(ProductId::from("A"), 2).await.unwrap();

        let view = carts.view(&cart, &DownCatalog).await;

        assert_eq!(view, CartView::Loading { total_items: 2 });
    }

    #[tokio::test]
    async fn test_view_empty_cart() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let cart = carts.load().await.unwrap();
        assert_eq!(carts.view(&cart, &DownCatalog).await, CartView::Empty);
    }

    #[test]
    fn test_share_link_encodes_cart() {
        let mut cart = Cart::new();
        cart.add(ProductId::from("A"), 2);
        cart.add(ProductId::from("B"), 1);
        assert_eq!(
            share_link("https://order.darsellami.tn/", &cart),
            "https://order.darsellami.tn/cart?cart=A%3A2%2CB%3A1"
        );
    }
}
