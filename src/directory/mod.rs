//! User directory capability and its implementations.
//!
//! The account controller never sees how passwords are stored or how roles are
//! kept; it only talks to [`UserDirectory`]. Two implementations ship with the
//! crate:
//!
//! - [`MemoryDirectory`]: process-local, used by tests and when no DSN is set.
//! - [`PgDirectory`]: `PostgreSQL` via `sqlx`, schema in `sql/schema.sql`.

mod memory;
mod password;
mod postgres;

pub use memory::MemoryDirectory;
pub use postgres::PgDirectory;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Role assigned to new accounts when no other default is configured.
pub const DEFAULT_ROLE: &str = "user";

/// Email + password pair submitted by the register and login forms.
#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    /// Build credentials with a normalized email.
    #[must_use]
    pub fn new(email: &str, password: SecretString) -> Self {
        Self {
            email: normalize_email(email),
            password,
        }
    }
}

/// A registered account as seen by the controller.
#[derive(ToSchema, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
}

/// Classification of a single login attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Email or password was empty.
    MissingInput,
    AccountNotFound,
    InvalidPassword,
    Success,
}

/// Outcome when attempting to create a new account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignupOutcome {
    Created,
    /// Another account already owns the email.
    Conflict,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up an account by (normalized) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Create an account with the configured default roles.
    async fn register(&self, credentials: &Credentials) -> Result<SignupOutcome>;

    /// Check credentials without creating any session state.
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome>;

    /// Roles in assignment order. Unknown ids have no roles.
    async fn roles_for(&self, account_id: Uuid) -> Result<Vec<String>>;

    /// Report whether the backing store is reachable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn credentials_normalize_email_and_keep_password() {
        let credentials = Credentials::new("  Bob@Example.com", SecretString::from("s3cret"));
        assert_eq!(credentials.email, "bob@example.com");
        assert_eq!(credentials.password.expose_secret(), "s3cret");
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let credentials = Credentials::new("bob@example.com", SecretString::from("s3cret"));
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("s3cret"));
    }
}
