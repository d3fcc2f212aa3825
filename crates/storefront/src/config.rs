//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session cookie signing key (min 64 chars, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `DELIVERY_FEE` - Flat fee charged on delivery orders (default: 8.00)
//! - `NOTIFICATION_URL` - Order notification endpoint (default: `{base_url}/api/email`)
//! - `SMTP_HOST` - SMTP relay; mail is disabled when unset
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SMTP_USERNAME` / `SMTP_PASSWORD` - SMTP credentials (required with `SMTP_HOST`)
//! - `SMTP_FROM` - Sender mailbox (default: `"<RESTAURANT_NAME>" <SMTP_USERNAME>`)
//! - `RESTAURANT_EMAIL` - Operator mailbox for new-order alerts
//! - `RESTAURANT_NAME`, `RESTAURANT_ADDRESS`, `RESTAURANT_PHONE`, `RESTAURANT_HOURS`
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use dar_sellami_core::{DEFAULT_DELIVERY_FEE, Email, Price};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Fee added to delivery orders
    pub delivery_fee: Price,
    /// Where the checkout posts `{ orderDetails }` after an order is stored
    pub notification_url: Url,
    /// SMTP settings; `None` disables outgoing mail
    pub email: Option<EmailConfig>,
    /// Public restaurant details
    pub restaurant: RestaurantProfile,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// SMTP configuration for order mail.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    /// `From:` mailbox, e.g. `"Dar Sellami Restaurant" <orders@darsellami.tn>`
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Restaurant contact details shown to customers and used in mail.
#[derive(Debug, Clone, Serialize)]
pub struct RestaurantProfile {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub hours: String,
    /// Operator mailbox receiving new-order alerts
    #[serde(skip)]
    pub email: Option<Email>,
}

impl Default for RestaurantProfile {
    fn default() -> Self {
        Self {
            name: "Dar Sellami Restaurant".to_owned(),
            address: "123 Dar Sellami Street, Tunis, Tunisia".to_owned(),
            phone: "+216 XX XXX XXX".to_owned(),
            hours: "9:00 AM - 8:00 PM".to_owned(),
            email: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_parsed_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default::<u16>("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let delivery_fee = parse_delivery_fee(get_optional_env("DELIVERY_FEE").as_deref())?;
        let notification_url = notification_url(
            &base_url,
            get_optional_env("NOTIFICATION_URL").as_deref(),
        )?;

        let restaurant = RestaurantProfile::from_env()?;
        let email = EmailConfig::from_env(&restaurant.name)?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            delivery_fee,
            notification_url,
            email,
            restaurant,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl EmailConfig {
    fn from_env(restaurant_name: &str) -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };
        let smtp_port = get_parsed_or_default::<u16>("SMTP_PORT", "587")?;
        let smtp_username = get_required_env("SMTP_USERNAME")?;
        let smtp_password = get_required_secret("SMTP_PASSWORD")?;
        let from_address = get_optional_env("SMTP_FROM")
            .unwrap_or_else(|| format!("\"{restaurant_name}\" <{smtp_username}>"));

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            from_address,
        }))
    }
}

impl RestaurantProfile {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let email = get_optional_env("RESTAURANT_EMAIL")
            .map(|raw| {
                Email::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("RESTAURANT_EMAIL".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            name: get_optional_env("RESTAURANT_NAME").unwrap_or(defaults.name),
            address: get_optional_env("RESTAURANT_ADDRESS").unwrap_or(defaults.address),
            phone: get_optional_env("RESTAURANT_PHONE").unwrap_or(defaults.phone),
            hours: get_optional_env("RESTAURANT_HOURS").unwrap_or(defaults.hours),
            email,
        })
    }
}

/// Parse `DELIVERY_FEE`, defaulting to 8.00. Negative amounts are rejected.
fn parse_delivery_fee(raw: Option<&str>) -> Result<Price, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_DELIVERY_FEE);
    };
    let fee = Decimal::from_str(raw.trim())
        .map(Price::new)
        .map_err(|e| ConfigError::InvalidEnvVar("DELIVERY_FEE".to_string(), e.to_string()))?;
    if fee.is_negative() {
        return Err(ConfigError::InvalidEnvVar(
            "DELIVERY_FEE".to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(fee)
}

/// Resolve the notification endpoint, defaulting to this site's `/api/email`.
fn notification_url(base_url: &str, explicit: Option<&str>) -> Result<Url, ConfigError> {
    if let Some(raw) = explicit {
        return Url::parse(raw)
            .map_err(|e| ConfigError::InvalidEnvVar("NOTIFICATION_URL".to_string(), e.to_string()));
    }
    Url::parse(base_url)
        .and_then(|base| base.join("/api/email"))
        .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string()))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-session-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_delivery_fee_default_and_override() {
        assert_eq!(parse_delivery_fee(None).unwrap(), Price::from_cents(800));
        assert_eq!(parse_delivery_fee(Some("5.50")).unwrap(), Price::from_cents(550));
        assert!(parse_delivery_fee(Some("-1")).is_err());
        assert!(parse_delivery_fee(Some("eight")).is_err());
    }

    #[test]
    fn test_notification_url_defaults_to_api_email() {
        let url = notification_url("https://order.darsellami.tn", None).unwrap();
        assert_eq!(url.as_str(), "https://order.darsellami.tn/api/email");

        let url = notification_url("http://x", Some("http://mailer:8080/notify")).unwrap();
        assert_eq!(url.as_str(), "http://mailer:8080/notify");
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_username: "orders@darsellami.tn".to_string(),
            smtp_password: SecretString::from("app-password-value"),
            from_address: "orders@darsellami.tn".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.gmail.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("app-password-value"));
    }
}
