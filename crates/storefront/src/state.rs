//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::catalog::{Catalog, MenuCatalog};
use crate::services::checkout::SubmitGuard;
use crate::services::email::{OrderMailer, SmtpMailer};
use crate::services::notifier::{HttpOrderNotifier, NotifyError, OrderNotifier};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("notification client: {0}")]
    Notifier(#[from] NotifyError),
    #[error("smtp transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: Arc<dyn Catalog>,
    notifier: Arc<dyn OrderNotifier>,
    mailer: Option<OrderMailer>,
    submit_guard: SubmitGuard,
}

impl AppState {
    /// Create the production state: database catalog, HTTP notifier, and SMTP
    /// mail when configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the SMTP transport cannot be
    /// built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let catalog = Arc::new(MenuCatalog::new(pool.clone()));
        let notifier = Arc::new(HttpOrderNotifier::new(config.notification_url.clone())?);
        let mailer = match &config.email {
            Some(email) => Some(OrderMailer::new(
                Arc::new(SmtpMailer::new(email)?),
                config.restaurant.clone(),
            )),
            None => {
                tracing::warn!("SMTP_HOST not set; order mail is disabled");
                None
            }
        };

        Ok(Self::with_collaborators(
            config, pool, catalog, notifier, mailer,
        ))
    }

    /// Create state from explicit collaborators.
    #[must_use]
    pub fn with_collaborators(
        config: StorefrontConfig,
        pool: PgPool,
        catalog: Arc<dyn Catalog>,
        notifier: Arc<dyn OrderNotifier>,
        mailer: Option<OrderMailer>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                notifier,
                mailer,
                submit_guard: SubmitGuard::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The menu.
    #[must_use]
    pub fn catalog(&self) -> &dyn Catalog {
        self.inner.catalog.as_ref()
    }

    /// Client for the notification endpoint.
    #[must_use]
    pub fn notifier(&self) -> &dyn OrderNotifier {
        self.inner.notifier.as_ref()
    }

    /// Order mailer, if SMTP is configured.
    #[must_use]
    pub fn mailer(&self) -> Option<&OrderMailer> {
        self.inner.mailer.as_ref()
    }

    /// Per-session submission tracking.
    #[must_use]
    pub fn submit_guard(&self) -> &SubmitGuard {
        &self.inner.submit_guard
    }
}
