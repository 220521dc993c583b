//! Password hashing via bcrypt.
//!
//! Used for both account passwords and reset-token verifiers.

use sha2::{Digest, Sha256};

use super::AuthError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// bcrypt only reads the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Cost-10 hash of a password no account uses. Verified against when there is
/// no real hash to check, so that path costs the same as a real check.
const DUMMY_HASH: &str = "$2b$10$abcdefghijklmnopqrstuuBCuh7avBdzT1kaNJL6LR0yl6qGyNYyq";

/// Reject passwords bcrypt would silently truncate.
pub fn check_password_length(password: &str) -> Result<(), AuthError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::ValidationError(format!(
            "password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Hash a password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    check_password_length(password)?;
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

/// [`hash_password`] on the blocking pool, so request tasks are not stalled.
pub async fn hash_password_blocking(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Internal(format!("hash task: {e}")))?
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::Internal(format!("verify task: {e}")))?
}

/// Run a full bcrypt verification against [`DUMMY_HASH`] and discard the result.
pub async fn dummy_verify_blocking(password: String) -> Result<(), AuthError> {
    verify_password_blocking(password, DUMMY_HASH.to_string())
        .await
        .map(|_| ())
}

/// Whether a stored value looks like a bcrypt hash (`$2a$`, `$2b$`, `$2x$`, `$2y$`).
pub fn is_bcrypt_hash(stored: &str) -> bool {
    stored.len() == 60
        && matches!(
            stored.get(..4),
            Some("$2a$") | Some("$2b$") | Some("$2x$") | Some("$2y$")
        )
}

/// Compare a submitted password against a legacy plaintext value.
///
/// Both sides are reduced to SHA-256 digests first so the comparison works
/// on fixed-length values.
pub fn matches_legacy_plaintext(password: &str, stored: &str) -> bool {
    Sha256::digest(password.as_bytes()) == Sha256::digest(stored.as_bytes())
}
