//! Order persistence.
//!
//! Orders are inserted once and never updated. Items are stored as a JSONB
//! array of `{id, name, price, quantity}` objects.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

use dar_sellami_core::{NewOrder, Order, OrderId};

use super::RepositoryError;
use crate::services::checkout::OrderStore;

/// Repository for order records.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and return the id the database assigned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, order: &NewOrder) -> Result<Option<OrderId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, OrderId>(
            r#"
            INSERT INTO storefront."order" (
                first_name, last_name, phone, email, delivery_type,
                address, governorate, pickup_time, notes,
                items, subtotal, delivery_fee, total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(&order.first_name)
        .bind(&order.last_name)
        .bind(&order.phone)
        .bind(order.email.as_str())
        .bind(order.delivery_type)
        .bind(order.address.as_deref())
        .bind(order.governorate.as_deref())
        .bind(order.pickup_time.as_deref())
        .bind(order.notes.as_deref())
        .bind(Json(&order.items))
        .bind(order.totals.subtotal)
        .bind(order.totals.delivery_fee)
        .bind(order.totals.total)
        .fetch_optional(self.pool)
        .await?;

        Ok(id)
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails or a row does
    /// not decode.
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

#[async_trait]
impl OrderStore for OrderRepository<'_> {
    async fn insert_order(&self, order: &NewOrder) -> Result<Option<OrderId>, RepositoryError> {
        self.insert(order).await
    }
}
