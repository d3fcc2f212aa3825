//! Storefront domain models.

use serde::Serialize;

use dar_sellami_core::{Price, ProductId};

/// A menu product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub description: Option<String>,
}
