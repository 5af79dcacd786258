//! `PostgreSQL` directory (`users` + `user_roles`, see `sql/schema.sql`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::{Connection, PgPool, Row};
use tracing::{Instrument, info_span, instrument, warn};
use uuid::Uuid;

use super::{
    Account, Credentials, LoginOutcome, SignupOutcome, UserDirectory, normalize_email,
    password::{hash_password, verify_password},
};

pub struct PgDirectory {
    pool: PgPool,
    default_roles: Vec<String>,
}

impl PgDirectory {
    #[must_use]
    pub fn new(pool: PgPool, default_roles: Vec<String>) -> Self {
        Self {
            pool,
            default_roles,
        }
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code == "23505"),
        _ => false,
    }
}

#[async_trait]
impl UserDirectory for PgDirectory {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let query = "SELECT id, email FROM users WHERE email = $1";
        let row = sqlx::query(query)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup account")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id: Uuid = row.get("id");
        let roles = self.roles_for(id).await?;

        Ok(Some(Account {
            id,
            email: row.get("email"),
            roles,
        }))
    }

    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn register(&self, credentials: &Credentials) -> Result<SignupOutcome> {
        let password_hash = hash_password(credentials.password.expose_secret())?;

        // User row and its default roles are created together or not at all.
        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin register transaction")?;

        let query = r"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id
        ";
        let row = sqlx::query(query)
            .bind(&credentials.email)
            .bind(&password_hash)
            .fetch_one(&mut *tx)
            .instrument(db_span("INSERT", query))
            .await;

        let user_id: Uuid = match row {
            Ok(row) => row.get("id"),
            Err(err) => {
                if is_unique_violation(&err) {
                    if let Err(err) = tx.rollback().await {
                        warn!("Failed to roll back register transaction: {err}");
                    }
                    return Ok(SignupOutcome::Conflict);
                }
                return Err(err).context("failed to insert user");
            }
        };

        let query = r"
            INSERT INTO user_roles (user_id, role, position)
            SELECT $1, role, position
            FROM UNNEST($2::text[]) WITH ORDINALITY AS r(role, position)
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(self.default_roles.as_slice())
            .execute(&mut *tx)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to insert default roles")?;

        tx.commit().await.context("commit register transaction")?;

        Ok(SignupOutcome::Created)
    }

    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome> {
        let password = credentials.password.expose_secret();
        if credentials.email.is_empty() || password.is_empty() {
            return Ok(LoginOutcome::MissingInput);
        }

        let query = "SELECT password_hash FROM users WHERE email = $1";
        let row = sqlx::query(query)
            .bind(&credentials.email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup password hash")?;

        let Some(row) = row else {
            return Ok(LoginOutcome::AccountNotFound);
        };
        let password_hash: String = row.get("password_hash");

        if verify_password(&password_hash, password) {
            Ok(LoginOutcome::Success)
        } else {
            Ok(LoginOutcome::InvalidPassword)
        }
    }

    #[instrument(skip(self))]
    async fn roles_for(&self, account_id: Uuid) -> Result<Vec<String>> {
        let query = "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY position";
        let rows = sqlx::query(query)
            .bind(account_id)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup roles")?;

        Ok(rows.iter().map(|row| row.get("role")).collect())
    }

    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")
    }
}
