// storefront/src/services/auth_service.rs

//! Password hashing (Argon2) and session tokens.

use crate::errors::AppError;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, error, instrument};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const SESSION_TOKEN_LEN: usize = 48;

/// Hashes a plain-text password with Argon2 defaults and a random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(AppError::Validation(format!(
      "Password must be at least {} characters long.",
      MIN_PASSWORD_LEN
    )));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing process failed: {}", argon_err))
    })
}

/// `Ok(false)` on a wrong password; `Err` only when the stored hash is unusable.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, provided_password: &str) -> Result<bool, AppError> {
  if stored_hash.is_empty() || provided_password.is_empty() {
    debug!("Empty hash or password, treating as mismatch.");
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(stored_hash).map_err(|parse_err| {
    error!(error = %parse_err, "Stored password hash is unreadable.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => Ok(false),
    Err(other) => {
      error!(error = %other, "Argon2 password verification failed.");
      Err(AppError::Internal(format!("Password verification process failed: {}", other)))
    }
  }
}

/// Opaque bearer token, 48 alphanumeric characters.
pub fn generate_session_token() -> String {
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(SESSION_TOKEN_LEN)
    .map(char::from)
    .collect()
}
