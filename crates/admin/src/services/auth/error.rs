//! Admin authentication error types.

use thiserror::Error;

use dar_sellami_core::StorageError;

/// Errors that can occur during admin authentication operations.
///
/// The display text is what the person signing in sees. Bad email and bad
/// password share one message.
#[derive(Debug, Error)]
pub enum AdminAuthError {
    /// No active account matched, or the password did not verify.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// More than one active account shares the email.
    #[error("Database integrity error. Please contact administrator.")]
    IntegrityFault,

    /// The account lookup itself failed.
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Accounts are provisioned out of band.
    #[error("Admin registration is not available through this interface")]
    SignUpDisabled,

    /// The session could not be written.
    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),

    /// A password could not be hashed.
    #[error("password hashing failed")]
    PasswordHash,
}

impl AdminAuthError {
    /// Stable code for clients and tests.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::IntegrityFault => "integrity_fault",
            Self::Connection(_) => "connection_error",
            Self::SignUpDisabled => "signup_disabled",
            Self::Storage(_) => "storage_error",
            Self::PasswordHash => "password_hash",
        }
    }
}
