//! Session middleware configuration for admin.
//!
//! `PostgreSQL`-backed sessions in the `admin` schema with stricter cookie
//! settings than the storefront (`SameSite=Strict`), signed by
//! `ADMIN_SESSION_SECRET`. The Admin Session Guard
//! keeps its own sign-in timestamp inside the session; the cookie expiry only
//! bounds how long an idle session row lives.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tower_sessions::cookie::{Key, KeyError};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use dar_sellami_core::{KeyValueStore, StorageError};

use crate::config::AdminConfig;

/// Session cookie name for admin.
pub const SESSION_COOKIE_NAME: &str = "ds_admin_session";

/// Create the session layer with `PostgreSQL` store.
///
/// # Errors
///
/// Returns `KeyError` if the session secret is shorter than 64 bytes.
///
/// # Panics
///
/// Panics if the schema name or table name is invalid (never happens with the
/// hardcoded "admin" and "session" values).
pub fn create_session_layer(
    pool: &PgPool,
    config: &AdminConfig,
) -> Result<SessionManagerLayer<PostgresStore, SignedCookie>, KeyError> {
    let key = cookie_key(&config.session_secret)?;

    // The session table is created by the admin migrations
    let store = PostgresStore::new(pool.clone())
        .with_schema_name("admin")
        .expect("valid schema name")
        .with_table_name("session")
        .expect("valid table name");

    let is_secure = config.base_url.starts_with("https://");
    let idle_seconds = config.session_timeout.num_seconds();

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(idle_seconds),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
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

/// A request's session viewed as string storage for the guard.
pub struct SessionStorage<'a> {
    session: &'a Session,
}

impl<'a> SessionStorage<'a> {
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
    fn test_cookie_key_rejects_short_secret() {
        let short = SecretString::from("k3Jd9sLq0vXz7RtY2wPm5NcB8hGf4AeU");
        assert!(cookie_key(&short).is_err());
        let long = SecretString::from(
            "k3Jd9sLq0vXz7RtY2wPm5NcB8hGf4AeUq1Wx6Zr2Tn8Vb4Mc0Ls7Pd3Hj9Kf5Ga1",
        );
        assert!(cookie_key(&long).is_ok());
    }
}
