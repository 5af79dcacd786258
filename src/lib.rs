//! # Turnstile (Account Registration, Login & Cookie Sessions)
//!
//! `turnstile` registers accounts, checks credentials against a user directory
//! and issues cookie-backed sessions carrying a claims-based principal.
//!
//! ## Account Flow
//!
//! - **Register:** the form is validated, the email is checked for an existing
//!   account, then the directory creates it. Duplicate emails are reported back
//!   on the form instead of failing the request.
//! - **Login:** the directory classifies the attempt (missing input, unknown
//!   account, wrong password, success). Only a successful attempt issues a
//!   session: a `Name` claim with the email plus one `Role` claim per role.
//! - **Logout:** every cookie sent with the request is deleted and the
//!   server-side session record is dropped.
//!
//! ## Collaborators
//!
//! The controller only talks to two capabilities, both injected at startup:
//! [`directory::UserDirectory`] for credentials and roles, and
//! [`api::SessionIssuer`] for signing principals in and out. Session state is
//! carried per request in an explicit [`api::SessionContext`].

pub mod api;
pub mod cli;
pub mod directory;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
