//! Menu product queries.

use sqlx::PgPool;

use dar_sellami_core::ProductId;

use super::RepositoryError;
use crate::models::Product;

/// Repository for the product catalog.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All available products, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, price, description
            FROM storefront.product
            WHERE is_available
            ORDER BY name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Products whose ids are in `ids`. Unknown ids are simply absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<&str> = ids.iter().map(ProductId::as_str).collect();
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, price, description
            FROM storefront.product
            WHERE id = ANY($1)
            ORDER BY name
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }
}
