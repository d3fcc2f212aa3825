//! Durable string storage.
//!
//! Cart contents and the admin session survive page loads by being written to
//! a [`KeyValueStore`] under fixed keys. Values are plain strings; the store
//! enforces no expiry, so anything time-bounded checks its own timestamp.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

/// Key holding the JSON-encoded cart ledger.
pub const CART_KEY: &str = "cart";

/// Key holding the JSON-encoded admin session identity.
pub const ADMIN_USER_KEY: &str = "adminUser";

/// Key holding the admin login time in epoch milliseconds.
pub const ADMIN_LOGIN_TIME_KEY: &str = "adminLoginTime";

/// Errors from a [`KeyValueStore`].
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    /// The backing store could not be read or written.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Async string storage keyed by name. Last writer wins; no merging.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Delete a value. Deleting an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store for tests and fakes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous read for assertions.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Synchronous write for seeding.
    pub fn seed(&self, key: &str, value: impl Into<String>) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.into());
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.seed(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get(CART_KEY).await.unwrap().is_none());

        store.set(CART_KEY, "{}".to_owned()).await.unwrap();
        assert_eq!(store.get(CART_KEY).await.unwrap().as_deref(), Some("{}"));

        store.set(CART_KEY, r#"{"A":1}"#.to_owned()).await.unwrap();
        assert_eq!(store.peek(CART_KEY).as_deref(), Some(r#"{"A":1}"#));

        store.remove(CART_KEY).await.unwrap();
        store.remove(CART_KEY).await.unwrap();
        assert!(store.peek(CART_KEY).is_none());
    }
}
