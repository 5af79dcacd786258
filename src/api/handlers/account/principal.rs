//! Claims, identities and principals.
//!
//! A successful login produces one [`ClaimsIdentity`]: a `Name` claim carrying
//! the email followed by one `Role` claim per directory role, in directory
//! order. Handlers that need an authenticated caller use [`require_session`].

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use super::{
    context::SessionContext,
    session::{Session, SessionIssuer},
};

/// Authentication schemes a session can be issued under.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    Cookie,
}

impl AuthScheme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cookie => "cookie",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Name,
    Role,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Claim {
    pub kind: ClaimKind,
    pub value: String,
}

impl Claim {
    pub fn name(value: impl Into<String>) -> Self {
        Self {
            kind: ClaimKind::Name,
            value: value.into(),
        }
    }

    pub fn role(value: impl Into<String>) -> Self {
        Self {
            kind: ClaimKind::Role,
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClaimsIdentity {
    claims: Vec<Claim>,
    scheme: AuthScheme,
}

impl ClaimsIdentity {
    #[must_use]
    pub fn new(claims: Vec<Claim>, scheme: AuthScheme) -> Self {
        Self { claims, scheme }
    }

    #[must_use]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    #[must_use]
    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }
}

/// Who is making the request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Principal {
    identity: ClaimsIdentity,
}

impl Principal {
    #[must_use]
    pub fn new(identity: ClaimsIdentity) -> Self {
        Self { identity }
    }

    #[must_use]
    pub fn identity(&self) -> &ClaimsIdentity {
        &self.identity
    }

    /// First `Name` claim.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.identity
            .claims
            .iter()
            .find(|claim| claim.kind == ClaimKind::Name)
            .map(|claim| claim.value.as_str())
    }

    #[must_use]
    pub fn roles(&self) -> Vec<&str> {
        self.identity
            .claims
            .iter()
            .filter(|claim| claim.kind == ClaimKind::Role)
            .map(|claim| claim.value.as_str())
            .collect()
    }
}

/// Resolve the session cookie into a session, or return 401 when missing.
pub async fn require_session(
    ctx: &SessionContext,
    issuer: &dyn SessionIssuer,
) -> Result<Session, StatusCode> {
    match issuer.authenticate(ctx).await {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(err) => {
            error!("Failed to resolve session: {err:#}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal::new(ClaimsIdentity::new(
            vec![
                Claim::name("alice@example.com"),
                Claim::role("user"),
                Claim::role("admin"),
            ],
            AuthScheme::Cookie,
        ))
    }

    #[test]
    fn principal_exposes_name_and_roles_in_order() {
        let principal = principal();
        assert_eq!(principal.name(), Some("alice@example.com"));
        assert_eq!(principal.roles(), vec!["user", "admin"]);
        assert_eq!(principal.identity().scheme(), AuthScheme::Cookie);
    }

    #[test]
    fn principal_without_claims_has_no_name() {
        let principal = Principal::new(ClaimsIdentity::new(Vec::new(), AuthScheme::Cookie));
        assert_eq!(principal.name(), None);
        assert!(principal.roles().is_empty());
    }

    #[test]
    fn claim_kind_serializes_snake_case() -> anyhow::Result<()> {
        let value = serde_json::to_value(Claim::role("user"))?;
        assert_eq!(value, serde_json::json!({"kind": "role", "value": "user"}));
        assert_eq!(AuthScheme::Cookie.as_str(), "cookie");
        Ok(())
    }
}
