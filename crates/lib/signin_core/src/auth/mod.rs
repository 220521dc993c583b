//! Authentication and authorization logic.
//!
//! Provides the signing-key manager, password hashing, JWT management,
//! password resets, and the credential store used by `signin_api`.

pub mod bootstrap;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod reset;
pub mod secret;
pub mod store;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Invalid or expired token")]
    InvalidResetToken,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
