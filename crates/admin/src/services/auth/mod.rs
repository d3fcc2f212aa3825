//! Admin Session Guard.
//!
//! Gates the dashboard behind a password sign-in and a time-bounded session.
//! The session is two plain strings in durable storage: the signed-in
//! identity under `adminUser` (JSON `{id, email}`) and the sign-in instant
//! under `adminLoginTime` (epoch milliseconds). Storage enforces no expiry;
//! [`AdminSessionGuard::check_auth_state`] does, purging a stale session the
//! first time it sees one.
//!
//! ```text
//! Unauthenticated ──sign_in──▶ Authenticating ──▶ Authenticated
//!        ▲                           │                 │
//!        └────────── failure ────────┘                 │
//!        └──────────── sign_out / expiry ──────────────┘
//! ```

mod error;
pub mod password;

pub use error::AdminAuthError;
pub use password::{MIN_PASSWORD_LENGTH, hash_password, verify_password};

use async_trait::async_trait;
use chrono::TimeDelta;
use tracing::{error, info, instrument, warn};

use dar_sellami_core::storage::{ADMIN_LOGIN_TIME_KEY, ADMIN_USER_KEY};
use dar_sellami_core::{Clock, KeyValueStore, StorageError};

use crate::db::RepositoryError;
use crate::models::{AdminAccount, SessionUser};

/// Source of admin accounts.
#[async_trait]
pub trait AdminAccountStore: Send + Sync {
    /// Active accounts whose email matches `email`, ignoring case.
    async fn lookup_active(&self, email: &str) -> Result<Vec<AdminAccount>, RepositoryError>;
}

/// Where the guard stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated(SessionUser),
}

impl AuthState {
    /// The signed-in admin, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&SessionUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Unauthenticated | Self::Authenticating => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Admin sign-in and session checks over injected collaborators.
pub struct AdminSessionGuard<'a, A: ?Sized, K: ?Sized, C: ?Sized> {
    accounts: &'a A,
    storage: &'a K,
    clock: &'a C,
    timeout: TimeDelta,
    state: AuthState,
    last_error: Option<String>,
}

impl<'a, A, K, C> AdminSessionGuard<'a, A, K, C>
where
    A: AdminAccountStore + ?Sized,
    K: KeyValueStore + ?Sized,
    C: Clock + ?Sized,
{
    /// Create a guard. It starts unauthenticated until
    /// [`check_auth_state`](Self::check_auth_state) or a sign-in says
    /// otherwise.
    #[must_use]
    pub const fn new(accounts: &'a A, storage: &'a K, clock: &'a C, timeout: TimeDelta) -> Self {
        Self {
            accounts,
            storage,
            clock,
            timeout,
            state: AuthState::Unauthenticated,
            last_error: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &AuthState {
        &self.state
    }

    /// Message of the last failed sign-in, cleared by a successful one.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Verify credentials and open a session.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` when no active account matches or the password
    ///   does not verify
    /// - `IntegrityFault` when more than one active account matches
    /// - `Connection` when the account lookup fails
    /// - `Storage` when the session cannot be written
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<SessionUser, AdminAuthError> {
        self.state = AuthState::Authenticating;

        match self.authenticate(email, password).await {
            Ok(user) => {
                info!(admin_id = %user.id, "Admin signed in");
                self.state = AuthState::Authenticated(user.clone());
                self.last_error = None;
                Ok(user)
            }
            Err(e) => {
                self.state = AuthState::Unauthenticated;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionUser, AdminAuthError> {
        let accounts = self
            .accounts
            .lookup_active(email.trim())
            .await
            .map_err(|e| {
                error!(error = %e, "Admin account lookup failed");
                AdminAuthError::Connection(e.to_string())
            })?;

        let account = match accounts.as_slice() {
            [] => {
                warn!("No active admin account for sign-in email");
                return Err(AdminAuthError::InvalidCredentials);
            }
            [account] => account,
            duplicates => {
                error!(
                    count = duplicates.len(),
                    "Multiple active admin accounts share one email"
                );
                return Err(AdminAuthError::IntegrityFault);
            }
        };

        if !verify_password(password, &account.password_hash) {
            warn!(admin_id = %account.id, "Admin password rejected");
            return Err(AdminAuthError::InvalidCredentials);
        }

        let user = SessionUser::from(account);
        self.persist(&user).await?;
        Ok(user)
    }

    async fn persist(&self, user: &SessionUser) -> Result<(), StorageError> {
        let identity =
            serde_json::to_string(user).map_err(|e| StorageError::Backend(e.to_string()))?;
        let issued_at = self.clock.now().timestamp_millis().to_string();

        self.storage.set(ADMIN_USER_KEY, identity).await?;
        self.storage.set(ADMIN_LOGIN_TIME_KEY, issued_at).await
    }

    /// Restore the state from storage.
    ///
    /// A session at least `timeout` old, or one that cannot be read back, is
    /// purged and reported as unauthenticated. Nothing here fails.
    #[instrument(skip(self))]
    pub async fn check_auth_state(&mut self) -> &AuthState {
        self.state = match self.restore().await {
            Some(user) => AuthState::Authenticated(user),
            None => AuthState::Unauthenticated,
        };
        &self.state
    }

    async fn restore(&self) -> Option<SessionUser> {
        let (identity, issued_at) = match (
            self.read(ADMIN_USER_KEY).await,
            self.read(ADMIN_LOGIN_TIME_KEY).await,
        ) {
            (Some(identity), Some(issued_at)) => (identity, issued_at),
            (None, None) => return None,
            _ => {
                warn!("Admin session is half written; clearing session");
                self.purge().await;
                return None;
            }
        };

        let Ok(issued_ms) = issued_at.trim().parse::<i64>() else {
            warn!("Admin login time is not a number; clearing session");
            self.purge().await;
            return None;
        };

        let elapsed_ms = self.clock.now().timestamp_millis().saturating_sub(issued_ms);
        if elapsed_ms >= self.timeout.num_milliseconds() {
            info!(elapsed_ms, "Admin session expired");
            self.purge().await;
            return None;
        }

        match serde_json::from_str::<SessionUser>(&identity) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Stored admin identity is unreadable; clearing session");
                self.purge().await;
                None
            }
        }
    }

    async fn read(&self, key: &str) -> Option<String> {
        self.storage.get(key).await.unwrap_or_else(|e| {
            warn!(error = %e, key, "Admin session read failed");
            None
        })
    }

    async fn purge(&self) {
        for key in [ADMIN_USER_KEY, ADMIN_LOGIN_TIME_KEY] {
            if let Err(e) = self.storage.remove(key).await {
                warn!(error = %e, key, "Admin session purge failed");
            }
        }
    }

    /// End the session. Always succeeds.
    #[instrument(skip(self))]
    pub async fn sign_out(&mut self) {
        self.purge().await;
        self.state = AuthState::Unauthenticated;
        info!("Admin signed out");
    }

    /// Self-service registration is not offered.
    ///
    /// # Errors
    ///
    /// Always returns `AdminAuthError::SignUpDisabled`.
    pub fn sign_up(&self, _email: &str, _password: &str) -> Result<SessionUser, AdminAuthError> {
        Err(AdminAuthError::SignUpDisabled)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::OnceLock;

    use chrono::{TimeZone, Utc};
    use dar_sellami_core::{AdminUserId, ManualClock, MemoryStore};

    use super::*;

    fn password_hash() -> &'static str {
        static HASH: OnceLock<String> = OnceLock::new();
        HASH.get_or_init(|| hash_password("couscous-friday-42").unwrap())
    }

    fn account(id: i32, email: &str) -> AdminAccount {
        AdminAccount {
            id: AdminUserId::new(id),
            email: email.to_string(),
            password_hash: password_hash().to_string(),
            is_active: true,
        }
    }

    struct Accounts(Vec<AdminAccount>);

    #[async_trait]
    impl AdminAccountStore for Accounts {
        async fn lookup_active(&self, email: &str) -> Result<Vec<AdminAccount>, RepositoryError> {
            Ok(self
                .0
                .iter()
                .filter(|a| a.is_active && a.email.eq_ignore_ascii_case(email))
                .cloned()
                .collect())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl AdminAccountStore for Unreachable {
        async fn lookup_active(&self, _email: &str) -> Result<Vec<AdminAccount>, RepositoryError> {
            Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_sign_in_persists_session() {
        let accounts = Accounts(vec![account(1, "chef@darsellami.tn")]);
        let storage = MemoryStore::new();
        let clock = clock();
        let mut guard = AdminSessionGuard::new(&accounts, &storage, &clock, TimeDelta::hours(24));

        let user = guard
            .sign_in("Chef@DarSellami.tn", "couscous-friday-42")
            .await
            .unwrap();

        assert_eq!(user.id, AdminUserId::new(1));
        assert!(guard.state().is_authenticated());
        assert_eq!(
            storage.peek(ADMIN_USER_KEY).unwrap(),
            r#"{"id":1,"email":"chef@darsellami.tn"}"#
        );
        assert_eq!(
            storage.peek(ADMIN_LOGIN_TIME_KEY).unwrap(),
            clock.now().timestamp_millis().to_string()
        );
    }

    #[tokio::test]
    async fn test_wrong_password_is_generic_error() {
        let accounts = Accounts(vec![account(1, "x@y.com")]);
        let storage = MemoryStore::new();
        let clock = clock();
        let mut guard = AdminSessionGuard::new(&accounts, &storage, &clock, TimeDelta::hours(24));

        let err = guard.sign_in("x@y.com", "bad").await.unwrap_err();

        assert!(matches!(err, AdminAuthError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid email or password");
        assert_eq!(guard.state(), &AuthState::Unauthenticated);
        assert_eq!(guard.last_error(), Some("Invalid email or password"));
        assert!(storage.peek(ADMIN_USER_KEY).is_none());
    }

    #[tokio::test]
    async fn test_unknown_email_matches_wrong_password_message() {
        let accounts = Accounts(vec![account(1, "x@y.com")]);
        let storage = MemoryStore::new();
        let clock = clock();
        let mut guard = AdminSessionGuard::new(&accounts, &storage, &clock, TimeDelta::hours(24));

        let err = guard
            .sign_in("nobody@y.com", "couscous-friday-42")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    #[tokio::test]
    async fn test_duplicate_accounts_are_integrity_fault() {
        let accounts = Accounts(vec![account(1, "x@y.com"), account(2, "X@Y.com")]);
        let storage = MemoryStore::new();
        let clock = clock();
        let mut guard = AdminSessionGuard::new(&accounts, &storage, &clock, TimeDelta::hours(24));

        let err = guard
            .sign_in("x@y.com", "couscous-friday-42")
            .await
            .unwrap_err();
        assert!(matches!(err, AdminAuthError::IntegrityFault));
        assert_eq!(guard.state(), &AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_connection_error() {
        let storage = MemoryStore::new();
        let clock = clock();
        let mut guard =
            AdminSessionGuard::new(&Unreachable, &storage, &clock, TimeDelta::hours(24));

        let err = guard.sign_in("x@y.com", "pw").await.unwrap_err();
        assert!(matches!(err, AdminAuthError::Connection(_)));
        assert!(err.to_string().starts_with("Database connection error: "));
    }

    #[tokio::test]
    async fn test_session_survives_until_timeout() {
        let accounts = Accounts(vec![account(1, "x@y.com")]);
        let storage = MemoryStore::new();
        let clock = clock();
        let mut guard = AdminSessionGuard::new(&accounts, &storage, &clock, TimeDelta::hours(24));
        guard.sign_in("x@y.com", "couscous-friday-42").await.unwrap();

        clock.advance(TimeDelta::hours(23));
        let mut fresh = AdminSessionGuard::new(&accounts, &storage, &clock, TimeDelta::hours(24));
        let state = fresh.check_auth_state().await.clone();
        assert_eq!(state.user().unwrap().email, "x@y.com");
    }

    #[tokio::test]
    async fn test_expired_session_is_purged() {
        let accounts = Accounts(Vec::new());
        let storage = MemoryStore::new();
        let clock = clock();
        let issued = clock.now() - TimeDelta::hours(25);
        storage.seed(ADMIN_USER_KEY, r#"{"id":1,"email":"x@y.com"}"#);
        storage.seed(ADMIN_LOGIN_TIME_KEY, &issued.timestamp_millis().to_string());

        let mut guard = AdminSessionGuard::new(&accounts, &storage, &clock, TimeDelta::hours(24));
        assert_eq!(guard.check_auth_state().await, &AuthState::Unauthenticated);
        assert!(storage.peek(ADMIN_USER_KEY).is_none());
        assert!(storage.peek(ADMIN_LOGIN_TIME_KEY).is_none());
    }

    #[tokio::test]
    async fn test_corrupt_session_is_purged() {
        let accounts = Accounts(Vec::new());
        let storage = MemoryStore::new();
        let clock = clock();
        storage.seed(ADMIN_USER_KEY, "{not json");
        storage.seed(ADMIN_LOGIN_TIME_KEY, &clock.now().timestamp_millis().to_string());

        let mut guard = AdminSessionGuard::new(&accounts, &storage, &clock, TimeDelta::hours(24));
        assert_eq!(guard.check_auth_state().await, &AuthState::Unauthenticated);
        assert!(storage.peek(ADMIN_USER_KEY).is_none());
    }

    #[tokio::test]
    async fn test_half_written_session_is_purged() {
        let accounts = Accounts(Vec::new());
        let clock = clock();

        let identity_only = MemoryStore::new();
        identity_only.seed(ADMIN_USER_KEY, r#"{"id":1,"email":"x@y.com"}"#);
        let mut guard =
            AdminSessionGuard::new(&accounts, &identity_only, &clock, TimeDelta::hours(24));
        assert_eq!(guard.check_auth_state().await, &AuthState::Unauthenticated);
        assert!(identity_only.peek(ADMIN_USER_KEY).is_none());

        let time_only = MemoryStore::new();
        time_only.seed(ADMIN_LOGIN_TIME_KEY, &clock.now().timestamp_millis().to_string());
        let mut guard =
            AdminSessionGuard::new(&accounts, &time_only, &clock, TimeDelta::hours(24));
        assert_eq!(guard.check_auth_state().await, &AuthState::Unauthenticated);
        assert!(time_only.peek(ADMIN_LOGIN_TIME_KEY).is_none());
    }

    #[tokio::test]
    async fn test_missing_session_is_unauthenticated() {
        let accounts = Accounts(Vec::new());
        let storage = MemoryStore::new();
        let clock = clock();
        let mut guard = AdminSessionGuard::new(&accounts, &storage, &clock, TimeDelta::hours(24));
        assert_eq!(guard.check_auth_state().await, &AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let accounts = Accounts(vec![account(1, "x@y.com")]);
        let storage = MemoryStore::new();
        let clock = clock();
        let mut guard = AdminSessionGuard::new(&accounts, &storage, &clock, TimeDelta::hours(24));
        guard.sign_in("x@y.com", "couscous-friday-42").await.unwrap();

        guard.sign_out().await;

        assert_eq!(guard.state(), &AuthState::Unauthenticated);
        assert!(storage.peek(ADMIN_USER_KEY).is_none());
        assert!(storage.peek(ADMIN_LOGIN_TIME_KEY).is_none());
    }

    #[tokio::test]
    async fn test_sign_up_is_disabled() {
        let accounts = Accounts(Vec::new());
        let storage = MemoryStore::new();
        let clock = clock();
        let guard = AdminSessionGuard::new(&accounts, &storage, &clock, TimeDelta::hours(24));
        let err = guard.sign_up("new@y.com", "pw").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Admin registration is not available through this interface"
        );
    }
}
