//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use dar_sellami_core::{Clock, KeyValueStore, SystemClock};

use crate::config::AdminConfig;
use crate::db::admin_users::PgAdminAccounts;
use crate::services::auth::{AdminAccountStore, AdminSessionGuard};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    accounts: Arc<dyn AdminAccountStore>,
    clock: Arc<dyn Clock>,
}

impl AppState {
    /// Production state: accounts from `PostgreSQL`, wall-clock time.
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool) -> Self {
        let accounts = Arc::new(PgAdminAccounts::new(pool.clone()));
        Self::with_collaborators(config, pool, accounts, Arc::new(SystemClock))
    }

    /// State over explicit collaborators.
    #[must_use]
    pub fn with_collaborators(
        config: AdminConfig,
        pool: PgPool,
        accounts: Arc<dyn AdminAccountStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                accounts,
                clock,
            }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// A session guard over `storage`, using the configured timeout.
    #[must_use]
    pub fn guard<'a, K: KeyValueStore + ?Sized>(
        &'a self,
        storage: &'a K,
    ) -> AdminSessionGuard<'a, dyn AdminAccountStore, K, dyn Clock> {
        AdminSessionGuard::new(
            self.inner.accounts.as_ref(),
            storage,
            self.inner.clock.as_ref(),
            self.inner.config.session_timeout,
        )
    }
}
