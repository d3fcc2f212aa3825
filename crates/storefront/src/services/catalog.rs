//! Catalog read path.
//!
//! The menu is read-only from the storefront's point of view. [`MenuCatalog`]
//! serves it from `PostgreSQL` with a 5 minute `moka` cache in front; tests
//! substitute any other [`Catalog`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use dar_sellami_core::ProductId;

use crate::db::{ProductRepository, RepositoryError};
use crate::models::Product;

/// Source of menu products.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Every product on the menu.
    async fn fetch_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// The products with the given ids; ids not on the menu are left out.
    async fn fetch_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let wanted: HashSet<&ProductId> = ids.iter().collect();
        let products = self.fetch_products().await?;
        Ok(products
            .into_iter()
            .filter(|p| wanted.contains(&p.id))
            .collect())
    }
}

/// Database-backed catalog with a short-lived in-memory copy of the menu.
#[derive(Clone)]
pub struct MenuCatalog {
    pool: PgPool,
    cache: Cache<(), Arc<Vec<Product>>>,
}

impl MenuCatalog {
    /// Create a catalog over `pool`; the menu is cached for 5 minutes.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { pool, cache }
    }

    /// Drop the cached menu so the next read hits the database.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}

#[async_trait]
impl Catalog for MenuCatalog {
    #[instrument(skip(self))]
    async fn fetch_products(&self) -> Result<Vec<Product>, RepositoryError> {
        if let Some(products) = self.cache.get(&()).await {
            debug!(count = products.len(), "Menu served from cache");
            return Ok(products.as_ref().clone());
        }

        let products = ProductRepository::new(&self.pool).list().await?;
        debug!(count = products.len(), "Menu loaded from database");
        self.cache.insert((), Arc::new(products.clone())).await;
        Ok(products)
    }
}
