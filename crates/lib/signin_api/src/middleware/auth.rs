//! Authentication middleware — Bearer token extraction, JWT verification,
//! identity resolution and the admin gate.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use signin_core::auth::AuthError;
use signin_core::models::auth::Identity;
use tracing::{debug, warn};

use crate::AppState;
use crate::error::AppError;

const BEARER_PREFIX: &str = "Bearer ";

/// Strip a case-insensitive `Bearer ` prefix, requiring a non-empty token after it.
pub fn bearer_token(header: &str) -> Option<&str> {
    if header.len() <= BEARER_PREFIX.len() {
        return None;
    }
    let (scheme, rest) = header.split_at_checked(BEARER_PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies the JWT,
/// resolves the account and injects an [`Identity`] into request extensions.
///
/// A valid token whose account no longer exists still passes, with only the
/// username populated.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = bearer_token(header)
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?;

    let claims = state.tokens.validate(token)?;

    let identity = match state.store.find_by_username(&claims.username).await {
        Ok(account) => Identity {
            username: account.username,
            email: Some(account.email),
            role: Some(account.role),
        },
        Err(AuthError::NotFound(_)) => {
            debug!(username = %claims.username, "token refers to a missing account");
            Identity {
                username: claims.username,
                email: None,
                role: None,
            }
        }
        Err(e) => return Err(e.into()),
    };

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Axum middleware: requires an admin [`Identity`].
///
/// Must be layered inside [`require_auth`]; a request without an identity is
/// rejected as unauthenticated.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    if !identity.is_admin() {
        warn!(username = %identity.username, "access denied: admin role required");
        return Err(AppError::Forbidden("Admin role required".into()));
    }

    Ok(next.run(request).await)
}
