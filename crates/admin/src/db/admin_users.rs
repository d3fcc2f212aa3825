//! Admin account repository.
//!
//! Emails are stored lower-cased and matched case-insensitively. Nothing in
//! the schema stops two rows sharing an email; the sign-in path treats that as
//! an integrity fault rather than picking one.

use async_trait::async_trait;
use sqlx::PgPool;

use dar_sellami_core::{AdminUserId, Email};

use super::RepositoryError;
use crate::models::AdminAccount;
use crate::services::auth::AdminAccountStore;

/// Repository for admin account database operations.
pub struct AdminUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminUserRepository<'a> {
    /// Create a new admin user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active accounts whose email matches, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lookup_active(&self, email: &str) -> Result<Vec<AdminAccount>, RepositoryError> {
        let accounts = sqlx::query_as::<_, AdminAccount>(
            r"
            SELECT id, email, password_hash, is_active
            FROM admin.admin_user
            WHERE lower(email) = lower($1) AND is_active
            ",
        )
        .bind(email.trim())
        .fetch_all(self.pool)
        .await?;

        Ok(accounts)
    }

    /// Insert an active account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an active account already uses
    /// the email, `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<AdminUserId, RepositoryError> {
        if !self.lookup_active(email.as_str()).await?.is_empty() {
            return Err(RepositoryError::Conflict(format!(
                "an active admin already uses {email}"
            )));
        }

        let id = sqlx::query_scalar::<_, AdminUserId>(
            r"
            INSERT INTO admin.admin_user (email, password_hash)
            VALUES ($1, $2)
            RETURNING id
            ",
        )
        .bind(email.normalized())
        .bind(password_hash)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Replace the password hash of every active account with this email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no active account matched.
    pub async fn set_password_hash(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE admin.admin_user
            SET password_hash = $2, updated_at = now()
            WHERE lower(email) = lower($1) AND is_active
            ",
        )
        .bind(email.as_str())
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Deactivate an account; it can no longer sign in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no active account matched.
    pub async fn deactivate(&self, email: &Email) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE admin.admin_user
            SET is_active = FALSE, updated_at = now()
            WHERE lower(email) = lower($1) AND is_active
            ",
        )
        .bind(email.as_str())
        .execute(self.pool)
        .await?;

        match result.rows_affected() {
            0 => Err(RepositoryError::NotFound),
            n => Ok(n),
        }
    }
}

#[async_trait]
impl AdminAccountStore for AdminUserRepository<'_> {
    async fn lookup_active(&self, email: &str) -> Result<Vec<AdminAccount>, RepositoryError> {
        Self::lookup_active(self, email).await
    }
}

/// Account store that owns its pool, for use in shared state.
#[derive(Clone)]
pub struct PgAdminAccounts {
    pool: PgPool,
}

impl PgAdminAccounts {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminAccountStore for PgAdminAccounts {
    async fn lookup_active(&self, email: &str) -> Result<Vec<AdminAccount>, RepositoryError> {
        AdminUserRepository::new(&self.pool).lookup_active(email).await
    }
}
