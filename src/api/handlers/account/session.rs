//! Session issuer capability and the cookie-backed implementation.
//!
//! Security boundaries: the raw session token only ever travels in the
//! `HttpOnly` cookie; the store is keyed by its SHA-256 hash.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    context::SessionContext,
    principal::{AuthScheme, Principal},
};

pub const DEFAULT_SESSION_COOKIE_NAME: &str = "turnstile_session";
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;

/// An authenticated session: the principal plus ambient values stored at sign-in.
#[derive(Clone, Debug)]
pub struct Session {
    pub principal: Principal,
    pub values: BTreeMap<String, String>,
}

#[async_trait]
pub trait SessionIssuer: Send + Sync {
    /// Establish a session for `principal` and queue its cookie on `ctx`.
    async fn sign_in(
        &self,
        ctx: &mut SessionContext,
        principal: Principal,
        scheme: AuthScheme,
    ) -> Result<()>;

    /// End the session presented on `ctx`, if any, and queue the cookie deletion.
    async fn sign_out(&self, ctx: &mut SessionContext, scheme: AuthScheme) -> Result<()>;

    /// Resolve the session presented on `ctx`. Missing or expired sessions are `None`.
    async fn authenticate(&self, ctx: &SessionContext) -> Result<Option<Session>>;
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    cookie_name: String,
    ttl_seconds: u64,
    cookie_secure: bool,
}

impl SessionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cookie_name: DEFAULT_SESSION_COOKIE_NAME.to_string(),
            ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: String) -> Self {
        self.cookie_name = name;
        self
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name, self.ttl_seconds
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn clear_session_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.cookie_name
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct StoredSession {
    session: Session,
    created_at: Instant,
}

/// Server-side session store addressed by an opaque cookie token.
pub struct CookieSessionIssuer {
    config: SessionConfig,
    sessions: Mutex<HashMap<Vec<u8>, StoredSession>>,
}

impl CookieSessionIssuer {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.ttl_seconds)
    }

    fn presented_token_hash(&self, ctx: &SessionContext) -> Option<Vec<u8>> {
        ctx.cookie(&self.config.cookie_name)
            .filter(|token| !token.is_empty())
            .map(hash_session_token)
    }
}

#[async_trait]
impl SessionIssuer for CookieSessionIssuer {
    async fn sign_in(
        &self,
        ctx: &mut SessionContext,
        principal: Principal,
        scheme: AuthScheme,
    ) -> Result<()> {
        let ttl = self.ttl();
        let previous = self.presented_token_hash(ctx);
        let session = Session {
            principal,
            values: ctx.values().clone(),
        };

        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, stored| stored.created_at.elapsed() < ttl);
        // A fresh token on every sign-in; the presented one is retired.
        if let Some(previous) = previous {
            sessions.remove(&previous);
        }

        for _ in 0..3 {
            let token = generate_session_token()?;
            let token_hash = hash_session_token(&token);
            if sessions.contains_key(&token_hash) {
                continue;
            }
            sessions.insert(
                token_hash,
                StoredSession {
                    session,
                    created_at: Instant::now(),
                },
            );
            drop(sessions);

            ctx.set_cookie(&self.config.cookie_name, self.config.session_cookie(&token));
            debug!(scheme = scheme.as_str(), "Session issued");
            return Ok(());
        }

        Err(anyhow!("failed to allocate a unique session token"))
    }

    async fn sign_out(&self, ctx: &mut SessionContext, scheme: AuthScheme) -> Result<()> {
        if let Some(token_hash) = self.presented_token_hash(ctx) {
            let removed = self.sessions.lock().await.remove(&token_hash).is_some();
            debug!(scheme = scheme.as_str(), removed, "Session ended");
        }

        // Always clear the cookie, even if the session record was missing.
        ctx.set_cookie(
            &self.config.cookie_name,
            self.config.clear_session_cookie(),
        );
        Ok(())
    }

    async fn authenticate(&self, ctx: &SessionContext) -> Result<Option<Session>> {
        let Some(token_hash) = self.presented_token_hash(ctx) else {
            return Ok(None);
        };

        let mut sessions = self.sessions.lock().await;
        let expired = match sessions.get(&token_hash) {
            None => return Ok(None),
            Some(stored) => stored.created_at.elapsed() >= self.ttl(),
        };
        if expired {
            sessions.remove(&token_hash);
            return Ok(None);
        }

        Ok(sessions
            .get(&token_hash)
            .map(|stored| stored.session.clone()))
    }
}

/// Create a new session token for the auth cookie.
fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
