//! Password hashing with Argon2id.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::AdminAuthError;

/// Minimum length accepted when provisioning an admin password.
pub const MIN_PASSWORD_LENGTH: usize = 12;

/// Hash a password into a PHC string with a fresh random salt.
///
/// # Errors
///
/// Returns `AdminAuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AdminAuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AdminAuthError::PasswordHash)
}

/// Check a password against a stored PHC hash.
///
/// A hash that does not parse never verifies.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        tracing::error!("Stored admin password hash is not a valid PHC string");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("harissa-and-olive-oil").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("harissa-and-olive-oil", &hash));
        assert!(!verify_password("harissa", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password-twice").unwrap();
        let b = hash_password("same-password-twice").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", ""));
    }
}
