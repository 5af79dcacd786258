//! Authentication flow controller.
//!
//! Flow Overview:
//! - Register: validate the form, reject emails that already have an account,
//!   then ask the directory to create one.
//! - Login: the directory classifies the attempt; only `Success` issues a
//!   session. Each submission is independent, there is no retry state.
//! - Logout: delete every request cookie, then sign out of the cookie scheme.
//!
//! The controller is transport agnostic; the axum handlers in this module map
//! its results to HTTP responses.

use anyhow::anyhow;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    context::{SESSION_EMAIL_KEY, SessionContext},
    error::AccountError,
    principal::{AuthScheme, Claim, ClaimsIdentity, Principal},
    session::SessionIssuer,
    types::{ACCESS_DENIED_VIEW, AccessDeniedView, LoginForm, RegisterForm},
};
use crate::directory::{Account, LoginOutcome, SignupOutcome, UserDirectory};

/// Where a single login attempt ends up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginState {
    Submitted,
    AccountNotFound,
    InvalidPassword,
    Authenticated,
}

impl LoginState {
    /// State after the directory classified the attempt. `MissingInput` never leaves `Submitted`.
    #[must_use]
    pub fn from_outcome(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::MissingInput => Self::Submitted,
            LoginOutcome::AccountNotFound => Self::AccountNotFound,
            LoginOutcome::InvalidPassword => Self::InvalidPassword,
            LoginOutcome::Success => Self::Authenticated,
        }
    }
}

pub struct AccountController {
    directory: Arc<dyn UserDirectory>,
    issuer: Arc<dyn SessionIssuer>,
}

impl AccountController {
    pub fn new(directory: Arc<dyn UserDirectory>, issuer: Arc<dyn SessionIssuer>) -> Self {
        Self { directory, issuer }
    }

    #[must_use]
    pub fn directory(&self) -> &dyn UserDirectory {
        self.directory.as_ref()
    }

    #[must_use]
    pub fn issuer(&self) -> &dyn SessionIssuer {
        self.issuer.as_ref()
    }

    /// Create an account for a valid, unused email.
    ///
    /// # Errors
    /// `ValidationFailure`, `DuplicateAccount`, or `Internal` on directory failure.
    #[instrument(skip_all, fields(email = %form.email))]
    pub async fn register(&self, form: RegisterForm) -> Result<(), AccountError> {
        let credentials = form.validate()?;

        // Check-then-create is not atomic; the directory's Conflict covers the gap.
        if self
            .directory
            .find_by_email(&credentials.email)
            .await?
            .is_some()
        {
            debug!("Account already exists");
            return Err(AccountError::DuplicateAccount);
        }

        match self.directory.register(&credentials).await? {
            SignupOutcome::Created => {
                info!("Account registered");
                Ok(())
            }
            SignupOutcome::Conflict => {
                debug!("Account created concurrently");
                Err(AccountError::DuplicateAccount)
            }
        }
    }

    /// Check credentials and, on success, sign the account in.
    ///
    /// # Errors
    /// `MissingInput`, `AccountNotFound`, `InvalidPassword`, or `Internal`.
    #[instrument(skip_all)]
    pub async fn login(
        &self,
        ctx: &mut SessionContext,
        form: Option<LoginForm>,
    ) -> Result<Principal, AccountError> {
        let Some(form) = form else {
            return Err(AccountError::MissingInput);
        };
        let credentials = form.into_credentials();

        let state = LoginState::from_outcome(self.directory.login(&credentials).await?);
        debug!(?state, email = %credentials.email, "Login attempt classified");

        match state {
            LoginState::Submitted => Err(AccountError::MissingInput),
            LoginState::AccountNotFound => Err(AccountError::AccountNotFound),
            LoginState::InvalidPassword => Err(AccountError::InvalidPassword),
            LoginState::Authenticated => {
                let account = self
                    .directory
                    .find_by_email(&credentials.email)
                    .await?
                    .ok_or_else(|| anyhow!("account disappeared after successful login"))?;
                self.issue_session(ctx, &account).await
            }
        }
    }

    /// Build the claims for `account` and sign it in under the cookie scheme.
    ///
    /// # Errors
    /// `Internal` when the role lookup or the session issuer fails.
    pub async fn issue_session(
        &self,
        ctx: &mut SessionContext,
        account: &Account,
    ) -> Result<Principal, AccountError> {
        let roles = self.directory.roles_for(account.id).await?;

        let mut claims = Vec::with_capacity(roles.len() + 1);
        claims.push(Claim::name(account.email.as_str()));
        claims.extend(roles.into_iter().map(Claim::role));

        let principal = Principal::new(ClaimsIdentity::new(claims, AuthScheme::Cookie));

        ctx.set_value(SESSION_EMAIL_KEY, account.email.clone());
        self.issuer
            .sign_in(ctx, principal.clone(), AuthScheme::Cookie)
            .await?;

        info!(account_id = %account.id, "Session issued");
        Ok(principal)
    }

    /// Delete every request cookie and end the session.
    ///
    /// # Errors
    /// `Internal` when the session issuer fails.
    #[instrument(skip_all)]
    pub async fn logout(&self, ctx: &mut SessionContext) -> Result<(), AccountError> {
        let names: Vec<String> = ctx.cookie_names().map(ToString::to_string).collect();
        for name in &names {
            ctx.delete_cookie(name);
        }
        self.issuer.sign_out(ctx, AuthScheme::Cookie).await?;
        debug!(cookies = names.len(), "Signed out");
        Ok(())
    }

    #[must_use]
    pub fn access_denied(&self) -> AccessDeniedView {
        AccessDeniedView {
            view: ACCESS_DENIED_VIEW.to_string(),
            message: "You do not have access to this resource".to_string(),
        }
    }
}
