//! Argon2id password hashing.
//!
//! Hashing is CPU bound, so the async wrappers move it onto the blocking pool.

use argon2::{
    Argon2, PasswordHash, PasswordVerifier,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use tracing::error;

use crate::api::error::ApiError;

/// PHC string for `password` with a fresh random salt.
///
/// # Errors
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// `false` on mismatch or on an unparsable stored hash.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

pub(crate) async fn hash_password_blocking(password: String) -> Result<String, ApiError> {
    match tokio::task::spawn_blocking(move || hash_password(&password)).await {
        Ok(Ok(hash)) => Ok(hash),
        Ok(Err(err)) => {
            error!("Failed to hash password: {err}");
            Err(ApiError::internal())
        }
        Err(err) => {
            error!("Password hashing task failed: {err}");
            Err(ApiError::internal())
        }
    }
}

pub(crate) async fn verify_password_blocking(
    password: String,
    hash: String,
) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|err| {
            error!("Password verification task failed: {err}");
            ApiError::internal()
        })
}
