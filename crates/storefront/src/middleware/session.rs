//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions, with the session
//! cookie signed by `STOREFRONT_SESSION_SECRET`, and exposes a request's
//! session as the [`KeyValueStore`] the cart is persisted in.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tower_sessions::cookie::{Key, KeyError};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use dar_sellami_core::{KeyValueStore, StorageError};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "ds_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// # Errors
///
/// Returns `KeyError` if the session secret is shorter than 64 bytes.
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> Result<SessionManagerLayer<PostgresStore, SignedCookie>, KeyError> {
    let key = cookie_key(&config.session_secret)?;

    // The sessions table is created by the storefront migrations
    let store = PostgresStore::new(pool.clone());

    let is_secure = config.base_url.starts_with("https://");

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}

/// Cookie signing key taken from the session secret's first 64 bytes.
///
/// # Errors
///
/// Returns `KeyError` if the secret is shorter than 64 bytes.
pub fn cookie_key(secret: &SecretString) -> Result<Key, KeyError> {
    Key::try_from(secret.expose_secret().as_bytes())
}

/// A request's session viewed as string storage.
pub struct SessionStorage<'a> {
    session: &'a Session,
}

impl<'a> SessionStorage<'a> {
    /// Wrap a session.
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }
}

fn backend(err: tower_sessions::session::Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

#[async_trait]
impl KeyValueStore for SessionStorage<'_> {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.session.get::<String>(key).await.map_err(backend)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.session.insert(key, value).await.map_err(backend)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.session
            .remove::<String>(key)
            .await
            .map(|_| ())
            .map_err(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_key_needs_64_bytes() {
        let short = SecretString::from("k3Jd9sLq0vXz7RtY2wPm5NcB8hGf4AeU");
        assert!(cookie_key(&short).is_err());

        let long = SecretString::from(
            "k3Jd9sLq0vXz7RtY2wPm5NcB8hGf4AeUq1Wx6Zr2Tn8Vb4Mc0Ls7Pd3Hj9Kf5Ga1",
        );
        assert!(cookie_key(&long).is_ok());
    }
}
