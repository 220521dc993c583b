//! JWT token generation and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use super::AuthError;
use super::secret::SigningKey;
use crate::models::auth::TokenClaims;

/// Bearer token lifetime: 24 hours.
pub const TOKEN_EXPIRY_SECS: i64 = 24 * 60 * 60;

/// Issues and validates HS256 bearer tokens under one signing key.
#[derive(Clone, Debug)]
pub struct TokenService {
    key: SigningKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(key: SigningKey) -> Self {
        Self {
            key,
            ttl: Duration::seconds(TOKEN_EXPIRY_SECS),
        }
    }

    /// Override the token lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Generate a signed token for `username`, valid from now for the configured lifetime.
    pub fn issue(&self, username: &str) -> Result<String, AuthError> {
        self.issue_at(username, Utc::now())
    }

    /// Generate a signed token as if issued at `issued_at`.
    pub fn issue_at(&self, username: &str, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = TokenClaims {
            username: username.to_string(),
            exp: (issued_at + self.ttl).timestamp(),
            iat: issued_at.timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.key.as_bytes()),
        )
        .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
    }

    /// Verify a token, returning its claims.
    ///
    /// Malformed, badly signed and expired tokens all yield the same error.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let key = DecodingKey::from_secret(self.key.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        let rejected = || AuthError::TokenError("Invalid or expired token".into());
        let claims = decode::<TokenClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "bearer token rejected");
                rejected()
            })?;
        // jsonwebtoken still accepts `exp == now`; a token expires at `exp`.
        if claims.exp <= Utc::now().timestamp() {
            debug!(exp = claims.exp, "bearer token rejected: expired");
            return Err(rejected());
        }
        Ok(claims)
    }
}
