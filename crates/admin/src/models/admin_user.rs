//! Admin account types.

use serde::{Deserialize, Serialize};

use dar_sellami_core::AdminUserId;

/// A stored admin account as returned by the account lookup.
///
/// `Debug` is implemented by hand so the password hash never reaches a log.
#[derive(Clone, sqlx::FromRow)]
pub struct AdminAccount {
    pub id: AdminUserId,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
}

impl std::fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAccount")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("is_active", &self.is_active)
            .finish()
    }
}

/// The identity kept in the admin session: no credentials, just who.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: AdminUserId,
    pub email: String,
}

impl From<&AdminAccount> for SessionUser {
    fn from(account: &AdminAccount) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_account_debug_redacts_hash() {
        let account = AdminAccount {
            id: AdminUserId::new(1),
            email: "chef@darsellami.tn".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            is_active: true,
        };
        let debug_output = format!("{account:?}");
        assert!(debug_output.contains("chef@darsellami.tn"));
        assert!(!debug_output.contains("argon2id"));
    }

    #[test]
    fn test_session_user_json_shape() {
        let user = SessionUser {
            id: AdminUserId::new(7),
            email: "chef@darsellami.tn".to_string(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(json, r#"{"id":7,"email":"chef@darsellami.tn"}"#);
    }
}
