//! Read-only access to stored orders.

use sqlx::PgPool;

use dar_sellami_core::Order;

use super::RepositoryError;

/// Repository over the storefront's order table.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, first_name, last_name, phone, email, delivery_type,
                   address, governorate, pickup_time, notes,
                   items, subtotal, delivery_fee, total, created_at
            FROM storefront."order"
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }
}
