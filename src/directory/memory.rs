//! Process-local directory backed by a map keyed by normalized email.

use anyhow::Result;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    Account, Credentials, DEFAULT_ROLE, LoginOutcome, SignupOutcome, UserDirectory,
    normalize_email,
    password::{hash_password, verify_password},
};

struct StoredAccount {
    account: Account,
    password_hash: String,
}

pub struct MemoryDirectory {
    default_roles: Vec<String>,
    accounts: RwLock<HashMap<String, StoredAccount>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new(default_roles: Vec<String>) -> Self {
        Self {
            default_roles,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Append a role to an existing account. Returns `false` for unknown emails.
    ///
    /// Registration only grants the default roles; this is how callers that own
    /// the process (seeding, tests) give an in-memory account anything more.
    pub async fn grant_role(&self, email: &str, role: &str) -> bool {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&normalize_email(email)) {
            Some(stored) => {
                if !stored.account.roles.iter().any(|r| r == role) {
                    stored.account.roles.push(role.to_string());
                }
                true
            }
            None => false,
        }
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new(vec![DEFAULT_ROLE.to_string()])
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .get(&normalize_email(email))
            .map(|stored| stored.account.clone()))
    }

    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn register(&self, credentials: &Credentials) -> Result<SignupOutcome> {
        // Hash before taking the lock; argon2 is slow on purpose.
        let password_hash = hash_password(credentials.password.expose_secret())?;

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&credentials.email) {
            return Ok(SignupOutcome::Conflict);
        }

        let account = Account {
            id: Uuid::new_v4(),
            email: credentials.email.clone(),
            roles: self.default_roles.clone(),
        };
        debug!(account_id = %account.id, "account created");
        accounts.insert(
            credentials.email.clone(),
            StoredAccount {
                account,
                password_hash,
            },
        );

        Ok(SignupOutcome::Created)
    }

    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome> {
        let password = credentials.password.expose_secret();
        if credentials.email.is_empty() || password.is_empty() {
            return Ok(LoginOutcome::MissingInput);
        }

        let password_hash = {
            let accounts = self.accounts.read().await;
            match accounts.get(&credentials.email) {
                Some(stored) => stored.password_hash.clone(),
                None => return Ok(LoginOutcome::AccountNotFound),
            }
        };

        if verify_password(&password_hash, password) {
            Ok(LoginOutcome::Success)
        } else {
            Ok(LoginOutcome::InvalidPassword)
        }
    }

    async fn roles_for(&self, account_id: Uuid) -> Result<Vec<String>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|stored| stored.account.id == account_id)
            .map(|stored| stored.account.roles.clone())
            .unwrap_or_default())
    }
}
