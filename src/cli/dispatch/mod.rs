//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action to run, such as starting the API
//! server with its session and directory configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_DSN, ARG_PORT, session};
use anyhow::Result;
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .map(|dsn| dsn.trim().to_string())
        .filter(|dsn| !dsn.is_empty())
        .map(SecretString::from);

    let session_opts = session::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        session_ttl_seconds: session_opts.ttl_seconds,
        session_cookie_name: session_opts.cookie_name,
        session_cookie_secure: session_opts.cookie_secure,
        default_roles: session_opts.default_roles,
    }))
}
