//! End-to-end account flow through the router, backed by the in-memory directory.

use anyhow::{Context, Result};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    response::Response,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use turnstile::api::{self, AccountController, CookieSessionIssuer, SessionConfig};
use turnstile::directory::MemoryDirectory;

const FORM: &str = "application/x-www-form-urlencoded";

fn app() -> (Router, Arc<MemoryDirectory>) {
    let directory = Arc::new(MemoryDirectory::default());
    let issuer = Arc::new(CookieSessionIssuer::new(SessionConfig::new()));
    let controller = Arc::new(AccountController::new(directory.clone(), issuer));
    (api::router(controller), directory)
}

async fn send(app: &Router, request: Request<Body>) -> Result<Response> {
    Ok(app.clone().oneshot(request).await?)
}

fn post_form(uri: &str, body: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, FORM)
        .body(Body::from(body.to_string()))?)
}

fn get(uri: &str, cookie: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    Ok(builder.body(Body::empty())?)
}

async fn json(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(ToString::to_string)
        .collect()
}

/// `name=value` of the session cookie set by a login response.
fn session_pair(response: &Response) -> Result<String> {
    set_cookies(response)
        .iter()
        .find(|cookie| cookie.starts_with("turnstile_session="))
        .and_then(|cookie| cookie.split(';').next())
        .map(ToString::to_string)
        .context("login should set the session cookie")
}

async fn register(app: &Router, email: &str, password: &str) -> Result<Response> {
    send(
        app,
        post_form(
            "/account/register",
            &format!("email={email}&password={password}&confirm_password={password}"),
        )?,
    )
    .await
}

#[tokio::test]
async fn register_redirects_to_login() -> Result<()> {
    let (app, _) = app();
    let response = register(&app, "alice%40example.com", "pw").await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
        Some("/account/login")
    );
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_redisplays_form() -> Result<()> {
    let (app, _) = app();
    register(&app, "alice%40example.com", "pw").await?;
    let response = register(&app, "Alice%40Example.com", "other").await?;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json(response).await?;
    assert_eq!(body["view"], "register");
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("password").is_none());
    assert!(
        body["errors"][0]
            .as_str()
            .is_some_and(|msg| msg.contains("already registered"))
    );
    Ok(())
}

#[tokio::test]
async fn invalid_registration_is_bad_request() -> Result<()> {
    let (app, _) = app();
    let response = send(
        &app,
        post_form(
            "/account/register",
            "email=nope&password=pw&confirm_password=different",
        )?,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await?;
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn login_without_submission_is_not_found() -> Result<()> {
    let (app, _) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/account/login")
        .body(Body::empty())?;
    let response = send(&app, request).await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(set_cookies(&response).is_empty());
    Ok(())
}

#[tokio::test]
async fn login_unknown_account_and_wrong_password() -> Result<()> {
    let (app, _) = app();
    register(&app, "alice%40example.com", "pw").await?;

    let response = send(
        &app,
        post_form("/account/login", "email=ghost%40example.com&password=pw")?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    let body = json(response).await?;
    assert_eq!(body["errors"][0], "No such account found");
    assert_eq!(body["email"], "ghost@example.com");

    let response = send(
        &app,
        post_form("/account/login", "email=alice%40example.com&password=nope")?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json(response).await?;
    assert_eq!(body["errors"][0], "Invalid email or password");
    Ok(())
}

#[tokio::test]
async fn login_session_and_logout() -> Result<()> {
    let (app, directory) = app();
    register(&app, "alice%40example.com", "pw").await?;
    directory.grant_role("alice@example.com", "admin").await;

    let response = send(
        &app,
        post_form("/account/login", "email=alice%40example.com&password=pw")?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
        Some("/")
    );
    let session_cookie = set_cookies(&response)
        .into_iter()
        .find(|cookie| cookie.starts_with("turnstile_session="))
        .context("missing session cookie")?;
    assert!(session_cookie.contains("HttpOnly"));
    assert!(session_cookie.contains("SameSite=Lax"));
    let session = session_pair(&response)?;

    let response = send(&app, get("/account/session", Some(&session))?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await?;
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["roles"], serde_json::json!(["user", "admin"]));
    assert_eq!(body["scheme"], "cookie");
    assert_eq!(body["claims"][0]["kind"], "name");

    let response = send(&app, get("/", Some(&session))?).await?;
    let body = json(response).await?;
    assert_eq!(body["email"], "alice@example.com");

    let cookies = format!("{session}; theme=dark");
    let response = send(&app, get("/account/logout", Some(&cookies))?).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cleared = set_cookies(&response);
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().all(|cookie| cookie.contains("Max-Age=0")));
    assert!(cleared.iter().any(|cookie| cookie.starts_with("theme=")));

    let response = send(&app, get("/account/session", Some(&session))?).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, get("/", Some(&session))?).await?;
    let body = json(response).await?;
    assert!(body["email"].is_null());

    let response = send(
        &app,
        post_form("/account/login", "email=alice%40example.com&password=pw")?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let renewed = session_pair(&response)?;
    assert_ne!(renewed, session);

    let response = send(&app, get("/account/session", Some(&renewed))?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await?;
    assert_eq!(body["email"], "alice@example.com");

    let response = send(&app, get("/account/session", Some(&session))?).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn form_views_and_access_denied() -> Result<()> {
    let (app, _) = app();

    let response = send(&app, get("/account/login", None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await?;
    assert_eq!(
        body,
        serde_json::json!({"view": "login", "email": "", "errors": []})
    );

    let response = send(&app, get("/account/register", None)?).await?;
    let body = json(response).await?;
    assert_eq!(body["view"], "register");

    let response = send(&app, get("/account/access-denied", None)?).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json(response).await?;
    assert_eq!(body["view"], "access_denied");
    Ok(())
}

#[tokio::test]
async fn health_and_openapi() -> Result<()> {
    let (app, _) = app();

    let response = send(&app, get("/health", None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    assert!(response.headers().contains_key("x-request-id"));
    let body = json(response).await?;
    assert_eq!(body["directory"], "ok");
    assert_eq!(body["name"], "turnstile");

    let response = send(&app, get("/openapi.json", None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await?;
    assert!(body["paths"].get("/account/login").is_some());
    Ok(())
}
