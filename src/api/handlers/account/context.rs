//! Per-request session context.
//!
//! Flow Overview: handlers build a context from the request headers, pass it
//! by `&mut` through the controller and the session issuer, then turn it into
//! `Set-Cookie` response headers. Nothing here outlives the request.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, SET_COOKIE},
};
use std::collections::BTreeMap;
use tracing::warn;

/// Ambient key holding the signed-in email.
pub const SESSION_EMAIL_KEY: &str = "email";

#[derive(Debug, Default)]
pub struct SessionContext {
    request_cookies: BTreeMap<String, String>,
    response_cookies: BTreeMap<String, String>,
    values: BTreeMap<String, String>,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect cookies from every `Cookie` header on the request.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut request_cookies = BTreeMap::new();
        for header in headers.get_all(COOKIE) {
            let Ok(value) = header.to_str() else {
                continue;
            };
            for (name, val) in parse_cookie_pairs(value) {
                request_cookies.insert(name.to_string(), val.to_string());
            }
        }
        Self {
            request_cookies,
            ..Self::default()
        }
    }

    /// Value of a cookie sent with the request.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.request_cookies.get(name).map(String::as_str)
    }

    pub fn cookie_names(&self) -> impl Iterator<Item = &str> {
        self.request_cookies.keys().map(String::as_str)
    }

    /// Queue a `Set-Cookie` for `name`. A later write for the same name wins.
    pub fn set_cookie(&mut self, name: &str, set_cookie: String) {
        self.response_cookies.insert(name.to_string(), set_cookie);
    }

    /// Queue an expiring `Set-Cookie` for `name`.
    pub fn delete_cookie(&mut self, name: &str) {
        self.set_cookie(name, format!("{name}=; Path=/; Max-Age=0"));
    }

    /// Pending `Set-Cookie` values, keyed by cookie name.
    #[must_use]
    pub fn pending_cookies(&self) -> &BTreeMap<String, String> {
        &self.response_cookies
    }

    pub fn set_value(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Turn queued cookie writes into response headers.
    #[must_use]
    pub fn into_headers(self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, set_cookie) in self.response_cookies {
            match HeaderValue::from_str(&set_cookie) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(err) => warn!(cookie = %name, "Dropping invalid Set-Cookie value: {err}"),
            }
        }
        headers
    }
}

fn parse_cookie_pairs(value: &str) -> impl Iterator<Item = (&str, &str)> {
    value.split(';').filter_map(|pair| {
        let mut parts = pair.trim().splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key.is_empty() {
            None
        } else {
            Some((key, val))
        }
    })
}
