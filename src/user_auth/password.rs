//! Password hashing and credential verification (Argon2id, PHC strings).

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use once_cell::sync::Lazy;

use super::error::AuthError;
use crate::users::UserStore;

/// Hash compared against when the identifier is unknown, so a miss costs the
/// same as a wrong password. `None` only if hashing itself is broken, which is
/// logged once here.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| {
    match hash_password("userhub-timing-equalizer") {
        Ok(hash) => Some(hash),
        Err(e) => {
            tracing::error!("timing equalizer hash unavailable: {}", e);
            None
        }
    }
});

/// Hash a plaintext password into a PHC string with a fresh salt.
pub fn hash_password(plaintext: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(format!("Hashing failed: {}", e)))
}

/// `true` only for a well-formed hash that matches.
fn matches_hash(plaintext: &str, stored: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!("stored password hash is unparseable: {}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// Checks an identifier/password pair against the stored hash.
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn UserStore>,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Unknown identifier and wrong password both yield
    /// [`AuthError::BadCredentials`]. Store failures are
    /// [`AuthError::Internal`].
    pub async fn verify(&self, identifier: &str, password: &str) -> Result<(), AuthError> {
        let stored = self.store.get_password_hash(identifier).await?;
        let known = stored.is_some();
        let Some(hash) = stored.or_else(|| DUMMY_HASH.clone()) else {
            return Err(AuthError::BadCredentials);
        };
        let password = password.to_owned();

        // Argon2 is deliberately slow, keep it off the async workers
        let matched = tokio::task::spawn_blocking(move || matches_hash(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("hash task failed: {}", e)))?;

        if known && matched {
            Ok(())
        } else {
            Err(AuthError::BadCredentials)
        }
    }
}
