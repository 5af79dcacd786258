use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use ulid::Ulid;

pub mod handlers;
mod openapi;

pub use handlers::account::{
    AccountController, AccountError, AuthScheme, CookieSessionIssuer, Principal, Session,
    SessionConfig, SessionContext, SessionIssuer,
};
pub use openapi::openapi;

use handlers::{account, health, root};

/// Build the router with every route and the request-id / trace layers.
#[must_use]
pub fn router(controller: Arc<AccountController>) -> Router {
    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health).options(health::health))
        .route(
            "/account/register",
            get(account::register_form).post(account::register),
        )
        .route(
            "/account/login",
            get(account::login_form).post(account::login),
        )
        .route("/account/logout", get(account::logout))
        .route("/account/access-denied", get(account::access_denied))
        .route("/account/session", get(account::session))
        .route("/openapi.json", get(openapi::openapi_json))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(controller)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn new(port: u16, controller: Arc<AccountController>) -> Result<()> {
    let app = router(controller);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
