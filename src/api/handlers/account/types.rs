//! Form and view types for account endpoints.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{error::AccountError, principal::Claim};
use crate::api::handlers::valid_email;
use crate::directory::{Credentials, normalize_email};

pub const REGISTER_VIEW: &str = "register";
pub const LOGIN_VIEW: &str = "login";
pub const ACCESS_DENIED_VIEW: &str = "access_denied";

#[derive(ToSchema, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    /// Check the form and turn it into credentials.
    ///
    /// # Errors
    /// Returns `ValidationFailure` with one message per problem.
    pub fn validate(self) -> Result<Credentials, AccountError> {
        let email = normalize_email(&self.email);
        let mut errors = Vec::new();

        if !valid_email(&email) {
            errors.push("Invalid email".to_string());
        }
        if self.password.is_empty() {
            errors.push("Password is required".to_string());
        } else if self.password != self.confirm_password {
            errors.push("Passwords do not match".to_string());
        }

        if errors.is_empty() {
            Ok(Credentials::new(&email, SecretString::from(self.password)))
        } else {
            Err(AccountError::ValidationFailure(errors))
        }
    }
}

impl std::fmt::Debug for RegisterForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterForm")
            .field("email", &self.email)
            .field("password", &"***")
            .field("confirm_password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    #[must_use]
    pub fn into_credentials(self) -> Credentials {
        Credentials::new(&self.email, SecretString::from(self.password))
    }
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// A form to (re)display. The password is never echoed back.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct FormView {
    pub view: String,
    pub email: String,
    pub errors: Vec<String>,
}

impl FormView {
    #[must_use]
    pub fn empty(view: &str) -> Self {
        Self {
            view: view.to_string(),
            email: String::new(),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_errors(view: &str, email: String, errors: Vec<String>) -> Self {
        Self {
            view: view.to_string(),
            email,
            errors,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct AccessDeniedView {
    pub view: String,
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub email: String,
    pub roles: Vec<String>,
    pub scheme: String,
    pub claims: Vec<Claim>,
}
