//! Password hashing and verification (Argon2id, PHC string format).

use std::fmt;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString, rand_core::OsRng},
};

use super::AuthnError;

/// A plaintext password. `Debug` never prints the value.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Hash a password with Argon2id and a random salt, for provisioning.
pub fn hash_password(password: &Password) -> Result<String, AuthnError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.expose().as_bytes(), &salt)
        .map_err(|e| AuthnError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC hash.
///
/// `Ok(false)` means the password is wrong; `Err` means the stored hash is
/// unusable. The comparison is constant-time.
pub fn verify_password(
    principal: &str,
    stored_hash: &str,
    password: &Password,
) -> Result<bool, AuthnError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AuthnError::InvalidStoredHash {
        principal: principal.to_string(),
        reason: e.to_string(),
    })?;

    match Argon2::default().verify_password(password.expose().as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthnError::InvalidStoredHash {
            principal: principal.to_string(),
            reason: e.to_string(),
        }),
    }
}
