use super::account::{AccountController, SESSION_EMAIL_KEY, SessionContext};
use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

/// Landing view; `email` is set when the request carries a live session.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Landing {
    pub name: String,
    pub version: String,
    pub email: Option<String>,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Landing view", body = Landing)
    ),
    tag = "turnstile"
)]
pub async fn root(
    headers: HeaderMap,
    controller: Extension<Arc<AccountController>>,
) -> impl IntoResponse {
    let ctx = SessionContext::from_headers(&headers);
    let email = match controller.issuer().authenticate(&ctx).await {
        Ok(session) => session.and_then(|session| session.values.get(SESSION_EMAIL_KEY).cloned()),
        Err(err) => {
            error!("Failed to resolve session: {err:#}");
            None
        }
    };

    Json(Landing {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        email,
    })
}
