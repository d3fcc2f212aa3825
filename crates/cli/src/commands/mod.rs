//! CLI subcommand implementations.

pub mod admin;
pub mod migrate;

use secrecy::SecretString;

/// Read a connection string, falling back to the shared `DATABASE_URL`.
pub(crate) fn database_url(primary_key: &'static str) -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
