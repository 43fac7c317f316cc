// SPDX-License-Identifier: MIT

//! Password hashing with Argon2id.
//!
//! Hashes carry their own salt and parameters in PHC string format, so
//! verification needs no extra configuration. Argon2's verifier compares
//! digests internally without short-circuiting on the plaintext.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Errors from the hashing layer.
///
/// Hashing failures are fatal to the calling operation; a malformed
/// stored digest is reported rather than treated as a mismatch.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a plaintext password against a stored PHC hash string.
///
/// Returns `Ok(false)` on mismatch; only a digest that cannot be parsed
/// at all is an error.
pub fn verify_password(plaintext: &str, digest: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(digest).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok())
}
