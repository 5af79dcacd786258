//! Argon2 password hashing shared by the directory implementations.

use anyhow::{Context, Result, anyhow};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use rand::{RngCore, rngs::OsRng};

/// Hash a password into a PHC string (`$argon2id$...`).
pub(super) fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .context("failed to generate password salt")?;
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|err| anyhow!("invalid password salt: {err}"))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?
        .to_string();
    Ok(phc)
}

/// Verify a password against a stored PHC string. Malformed hashes never match.
pub(super) fn verify_password(phc: &str, password: &str) -> bool {
    PasswordHash::new(phc).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}
