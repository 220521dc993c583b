//! Self-service password reset.
//!
//! A reset token is `<selector>.<verifier>`. The selector is stored in clear
//! and used to find the request; only a bcrypt hash of the 256-bit verifier
//! is stored. A token is consumed at most once.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use tracing::{info, warn};

use super::AuthError;
use super::password::{check_password_length, hash_password_blocking, verify_password_blocking};
use super::store::CredentialStore;
use crate::models::auth::ResetRecord;

/// Reset request lifetime: 15 minutes.
pub const RESET_TOKEN_EXPIRY_SECS: i64 = 15 * 60;

const SELECTOR_BYTES: usize = 16;
const VERIFIER_BYTES: usize = 32;

/// Plaintext reset token split into its lookup and secret halves.
#[derive(Debug, PartialEq, Eq)]
struct ResetToken<'a> {
    selector: &'a str,
    verifier: &'a str,
}

impl<'a> ResetToken<'a> {
    fn parse(token: &'a str) -> Option<Self> {
        let (selector, verifier) = token.trim().split_once('.')?;
        let well_formed = |part: &str, bytes: usize| {
            part.len() == bytes * 2 && part.bytes().all(|b| b.is_ascii_hexdigit())
        };
        if !well_formed(selector, SELECTOR_BYTES) || !well_formed(verifier, VERIFIER_BYTES) {
            return None;
        }
        Some(Self { selector, verifier })
    }
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Create a reset request for `email`.
///
/// Returns `Ok(None)` when no account uses the email; callers must answer
/// identically either way. Any earlier request for the same email is
/// discarded. The returned plaintext token is never stored.
pub async fn request_reset(
    store: &dyn CredentialStore,
    email: &str,
) -> Result<Option<String>, AuthError> {
    request_reset_at(store, email, Utc::now()).await
}

/// [`request_reset`] with an explicit clock.
pub async fn request_reset_at(
    store: &dyn CredentialStore,
    email: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>, AuthError> {
    let known = store.email_exists(email).await?;

    // Unknown emails pay for the same hash so both answers take as long.
    let selector = random_hex(SELECTOR_BYTES);
    let verifier = random_hex(VERIFIER_BYTES);
    let token_hash = hash_password_blocking(verifier.clone()).await?;
    if !known {
        return Ok(None);
    }

    let record = ResetRecord {
        selector: selector.clone(),
        email: email.to_string(),
        token_hash,
        expires_at: (now + Duration::seconds(RESET_TOKEN_EXPIRY_SECS)).timestamp(),
    };
    store.replace_reset(&record).await?;
    info!(selector = %selector, "password reset requested");

    Ok(Some(format!("{selector}.{verifier}")))
}

/// Consume `token` and set a new password for its account.
///
/// Unknown, malformed, expired and already-used tokens all fail with
/// [`AuthError::InvalidResetToken`].
pub async fn reset_password(
    store: &dyn CredentialStore,
    token: &str,
    new_password: &str,
) -> Result<(), AuthError> {
    reset_password_at(store, token, new_password, Utc::now()).await
}

/// [`reset_password`] with an explicit clock.
pub async fn reset_password_at(
    store: &dyn CredentialStore,
    token: &str,
    new_password: &str,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    check_password_length(new_password)?;
    let parsed = ResetToken::parse(token).ok_or(AuthError::InvalidResetToken)?;
    let record = store
        .find_reset(parsed.selector)
        .await?
        .ok_or(AuthError::InvalidResetToken)?;

    if !verify_password_blocking(parsed.verifier.to_string(), record.token_hash.clone()).await? {
        return Err(AuthError::InvalidResetToken);
    }

    if record.expires_at <= now.timestamp() {
        store.claim_reset(&record.selector).await?;
        return Err(AuthError::InvalidResetToken);
    }

    let new_hash = hash_password_blocking(new_password.to_string()).await?;

    // Only the request that removes the row may change the password.
    if !store.consume_reset(&record.selector, &new_hash).await? {
        warn!(selector = %record.selector, "reset token already consumed");
        return Err(AuthError::InvalidResetToken);
    }
    info!(selector = %record.selector, "password reset completed");
    Ok(())
}
