//! # LoginUser
//!
//! Verifies a username/password pair against the stored Argon2 hash and
//! returns the user record without its password.
//!
//! Unknown usernames and wrong passwords produce the same error, and both pay
//! for one Argon2 verification, so response time does not reveal which
//! usernames exist.

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use rand::{rngs::OsRng, RngCore};
use shared_types::{ActionError, LoginCredentials, User};
use tracing::debug;

use crate::domain::Action;
use crate::ports::{StoreError, UserStore};

/// Verified in place of a stored hash when the username is unknown.
///
/// Same algorithm and cost parameters as `hash_password`; no password
/// matches it.
const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Hash a password into an Argon2 PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ActionError> {
    let mut salt_bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .map_err(|e| ActionError::Internal(format!("salt generation failed: {e}")))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| ActionError::Internal(format!("salt encoding failed: {e}")))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ActionError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, stored_hash: &str) -> Result<(), ActionError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ActionError::Internal(format!("stored password hash is invalid: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(()),
        Err(password_hash::Error::Password) => Err(ActionError::InvalidCredentials),
        Err(e) => Err(ActionError::Internal(format!(
            "password verification failed: {e}"
        ))),
    }
}

/// The `LoginUser` action.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginAction;

impl LoginAction {
    /// Look up the user; `Ok(None)` if the username is unknown.
    ///
    /// An unknown user is the caller's error (`1001`), while an unreachable
    /// store is reported as internal (`2003`) so operators can tell outages
    /// apart from bad logins.
    async fn lookup(store: &dyn UserStore, user_name: &str) -> Result<Option<User>, ActionError> {
        match store.find_by_username(user_name).await {
            Ok(user) => Ok(Some(user)),
            Err(StoreError::NotFound(_)) => {
                debug!("Login for unknown user");
                Ok(None)
            }
            Err(e) => Err(ActionError::Storage(e.to_string())),
        }
    }
}

#[async_trait]
impl Action for LoginAction {
    async fn execute(&self, store: &dyn UserStore, payload: &[u8]) -> Result<Vec<u8>, ActionError> {
        let credentials: LoginCredentials = serde_json::from_slice(payload)
            .map_err(|e| ActionError::PayloadDecode(e.to_string()))?;

        let mut user = Self::lookup(store, &credentials.user_name).await?;

        // Taking the hash also clears it from the record that is returned.
        let stored_hash = match user.as_mut() {
            Some(user) => std::mem::take(&mut user.password),
            None => UNKNOWN_USER_HASH.to_string(),
        };

        // Verification blocks for tens of milliseconds; run it off the async workers.
        let verified = tokio::task::spawn_blocking(move || {
            verify_password(&credentials.password, &stored_hash)
        })
        .await
        .map_err(|e| ActionError::Internal(format!("password verification task failed: {e}")))?;

        let Some(user) = user else {
            return Err(ActionError::InvalidCredentials);
        };
        verified?;

        serde_json::to_vec(&user)
            .map_err(|e| ActionError::ResultEncode(e.to_string()))
    }
}
