//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! ds-cli migrate storefront
//! ds-cli migrate admin
//! ds-cli migrate all
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for storefront
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string for admin
//!
//! Both fall back to `DATABASE_URL`. The two migration sets may share one
//! database and therefore one `_sqlx_migrations` table, so each run ignores
//! versions it does not know about.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use thiserror::Error;

use super::database_url;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    run(
        "storefront",
        "STOREFRONT_DATABASE_URL",
        sqlx::migrate!("../storefront/migrations"),
    )
    .await
}

/// Run admin database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration fails.
pub async fn admin() -> Result<(), MigrationError> {
    run("admin", "ADMIN_DATABASE_URL", sqlx::migrate!("../admin/migrations")).await
}

async fn run(
    target: &str,
    env_key: &'static str,
    mut migrator: Migrator,
) -> Result<(), MigrationError> {
    let url = database_url(env_key).ok_or(MigrationError::MissingEnvVar(env_key))?;

    tracing::info!("Connecting to {target} database...");
    let pool = PgPool::connect(url.expose_secret()).await?;

    tracing::info!("Running {target} migrations...");
    migrator.set_ignore_missing(true).run(&pool).await?;

    tracing::info!("{target} migrations complete!");
    Ok(())
}
