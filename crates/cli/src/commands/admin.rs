//! Admin account provisioning.
//!
//! There is no sign-up page; accounts are created and retired here.
//!
//! # Usage
//!
//! ```bash
//! # Create an account (a random password is generated and printed)
//! ds-cli admin create -e chef@darsellami.tn
//!
//! # Print the SQL that resets a password
//! ds-cli admin hash-password -e chef@darsellami.tn -p 'new long passphrase'
//!
//! # Retire an account
//! ds-cli admin deactivate -e chef@darsellami.tn
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use dar_sellami_admin::db::{AdminUserRepository, RepositoryError};
use dar_sellami_admin::services::auth::{AdminAuthError, MIN_PASSWORD_LENGTH, hash_password};
use dar_sellami_core::{AdminUserId, Email};

use super::database_url;

const GENERATED_PASSWORD_LENGTH: usize = 24;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Password must be at least {} characters", MIN_PASSWORD_LENGTH)]
    WeakPassword,

    #[error(transparent)]
    Hash(#[from] AdminAuthError),
}

/// Create an active admin account.
///
/// Without `password`, one is generated and returned alongside the new id so
/// the caller can hand it over.
///
/// # Errors
///
/// Returns `AdminError` for an invalid email or short password, when an active
/// account already uses the email, or when the database is unreachable.
pub async fn create_user(
    email: &str,
    password: Option<String>,
) -> Result<(AdminUserId, Option<String>), AdminError> {
    let email = parse_email(email)?;
    let (password, generated) = match password {
        Some(password) => (password, false),
        None => (generate_password(), true),
    };
    let password_hash = hashed(&password)?;

    let pool = connect().await?;
    tracing::info!("Creating admin user: {}", email);

    let id = AdminUserRepository::new(&pool)
        .create(&email, &password_hash)
        .await?;

    tracing::info!("Admin user created successfully! ID: {}, Email: {}", id, email);
    Ok((id, generated.then_some(password)))
}

/// The SQL statement that resets an account's password.
///
/// Nothing is executed; the statement is meant to be reviewed and run by hand.
///
/// # Errors
///
/// Returns `AdminError` for an invalid email or short password.
pub fn password_reset_sql(email: &str, password: &str) -> Result<String, AdminError> {
    let email = parse_email(email)?;
    let password_hash = hashed(password)?;

    Ok(format!(
        "UPDATE admin.admin_user SET password_hash = '{password_hash}', updated_at = now() \
         WHERE lower(email) = lower('{}') AND is_active;",
        email.as_str().replace('\'', "''"),
    ))
}

/// Deactivate every active account with the email.
///
/// # Errors
///
/// Returns `AdminError` when no active account matches or the database is
/// unreachable.
pub async fn deactivate_user(email: &str) -> Result<u64, AdminError> {
    let email = parse_email(email)?;
    let pool = connect().await?;

    let count = AdminUserRepository::new(&pool).deactivate(&email).await?;
    tracing::info!("Deactivated {} admin account(s) for {}", count, email);
    Ok(count)
}

fn parse_email(email: &str) -> Result<Email, AdminError> {
    Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))
}

fn hashed(password: &str) -> Result<String, AdminError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AdminError::WeakPassword);
    }
    Ok(hash_password(password)?)
}

fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

async fn connect() -> Result<PgPool, AdminError> {
    let url = database_url("ADMIN_DATABASE_URL")
        .ok_or(AdminError::MissingEnvVar("ADMIN_DATABASE_URL"))?;

    tracing::info!("Connecting to admin database...");
    Ok(PgPool::connect(url.expose_secret()).await?)
}
