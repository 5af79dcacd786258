//! API handlers and shared utilities.

pub mod account;
pub mod health;
pub mod root;

use regex::Regex;

/// Lightweight email sanity check used before touching the directory.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}
