//! Account endpoints: register, login, logout, access denied and session.
//!
//! Handlers are thin: they build a [`SessionContext`] from the request headers,
//! call the [`AccountController`], and turn the context back into `Set-Cookie`
//! headers on the response. Failed submissions redisplay the form as JSON with
//! the entered email and the error messages.

pub mod context;
pub mod controller;
pub mod error;
pub mod principal;
pub mod session;
pub mod types;


pub use self::context::{SESSION_EMAIL_KEY, SessionContext};
pub use self::controller::{AccountController, LoginState};
pub use self::error::AccountError;
pub use self::principal::{
    AuthScheme, Claim, ClaimKind, ClaimsIdentity, Principal, require_session,
};
pub use self::session::{CookieSessionIssuer, Session, SessionConfig, SessionIssuer};

use axum::{
    Form, Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{error, instrument};

use self::types::{
    AccessDeniedView, FormView, LOGIN_VIEW, LoginForm, REGISTER_VIEW, RegisterForm,
    SessionResponse,
};
use crate::directory::normalize_email;

pub const LOGIN_PATH: &str = "/account/login";
pub const LANDING_PATH: &str = "/";

/// Redisplay `view` with the entered email and the error's messages.
fn form_error(view: &str, email: String, err: &AccountError) -> Response {
    if let AccountError::Internal(source) = err {
        error!("Account request failed: {source:#}");
    }
    (
        err.status(),
        Json(FormView::with_errors(view, email, err.messages())),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/account/register",
    responses(
        (status = 200, description = "Empty registration form", body = FormView)
    ),
    tag = "account"
)]
pub async fn register_form() -> impl IntoResponse {
    Json(FormView::empty(REGISTER_VIEW))
}

#[utoipa::path(
    post,
    path = "/account/register",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Account created, continue to login"),
        (status = 400, description = "Form validation failed", body = FormView),
        (status = 409, description = "Email already registered", body = FormView),
        (status = 500, description = "Directory failure", body = FormView)
    ),
    tag = "account"
)]
#[instrument(skip(controller, payload))]
pub async fn register(
    controller: Extension<Arc<AccountController>>,
    payload: Option<Form<RegisterForm>>,
) -> Response {
    let Some(Form(form)) = payload else {
        let err = AccountError::ValidationFailure(vec!["Missing registration form".to_string()]);
        return form_error(REGISTER_VIEW, String::new(), &err);
    };
    let email = normalize_email(&form.email);

    match controller.register(form).await {
        Ok(()) => Redirect::to(LOGIN_PATH).into_response(),
        Err(err) => form_error(REGISTER_VIEW, email, &err),
    }
}

#[utoipa::path(
    get,
    path = "/account/login",
    responses(
        (status = 200, description = "Empty login form", body = FormView)
    ),
    tag = "account"
)]
pub async fn login_form() -> impl IntoResponse {
    Json(FormView::empty(LOGIN_VIEW))
}

#[utoipa::path(
    post,
    path = "/account/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Signed in, session cookie set"),
        (status = 401, description = "Unknown account or wrong password", body = FormView),
        (status = 404, description = "Missing login submission", body = FormView),
        (status = 500, description = "Directory or session failure", body = FormView)
    ),
    tag = "account"
)]
#[instrument(skip(headers, controller, payload))]
pub async fn login(
    headers: HeaderMap,
    controller: Extension<Arc<AccountController>>,
    payload: Option<Form<LoginForm>>,
) -> Response {
    let mut ctx = SessionContext::from_headers(&headers);
    let email = payload
        .as_ref()
        .map(|Form(form)| normalize_email(&form.email))
        .unwrap_or_default();

    match controller
        .login(&mut ctx, payload.map(|Form(form)| form))
        .await
    {
        Ok(_) => (ctx.into_headers(), Redirect::to(LANDING_PATH)).into_response(),
        Err(err) => form_error(LOGIN_VIEW, email, &err),
    }
}

#[utoipa::path(
    get,
    path = "/account/logout",
    responses(
        (status = 303, description = "Every request cookie deleted, session ended")
    ),
    tag = "account"
)]
#[instrument(skip(headers, controller))]
pub async fn logout(
    headers: HeaderMap,
    controller: Extension<Arc<AccountController>>,
) -> Response {
    let mut ctx = SessionContext::from_headers(&headers);
    if let Err(err) = controller.logout(&mut ctx).await {
        error!("Failed to sign out: {err:#}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    (ctx.into_headers(), Redirect::to(LANDING_PATH)).into_response()
}

#[utoipa::path(
    get,
    path = "/account/access-denied",
    responses(
        (status = 403, description = "Access denied", body = AccessDeniedView)
    ),
    tag = "account"
)]
pub async fn access_denied(controller: Extension<Arc<AccountController>>) -> impl IntoResponse {
    (StatusCode::FORBIDDEN, Json(controller.access_denied()))
}

#[utoipa::path(
    get,
    path = "/account/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 401, description = "No active session")
    ),
    tag = "account"
)]
pub async fn session(
    headers: HeaderMap,
    controller: Extension<Arc<AccountController>>,
) -> Result<Json<SessionResponse>, StatusCode> {
    let ctx = SessionContext::from_headers(&headers);
    let session = require_session(&ctx, controller.issuer()).await?;

    let principal = &session.principal;
    let email = session
        .values
        .get(SESSION_EMAIL_KEY)
        .cloned()
        .or_else(|| principal.name().map(ToString::to_string))
        .unwrap_or_default();

    Ok(Json(SessionResponse {
        email,
        roles: principal.roles().into_iter().map(ToString::to_string).collect(),
        scheme: principal.identity().scheme().as_str().to_string(),
        claims: principal.identity().claims().to_vec(),
    }))
}
