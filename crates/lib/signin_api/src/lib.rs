//! # signin_api
//!
//! HTTP API library for Signin.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use signin_core::auth::jwt::TokenService;
use signin_core::auth::store::CredentialStore;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{account, admin, auth};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Account and reset-request storage.
    pub store: Arc<dyn CredentialStore>,
    /// Bearer token issuer/validator holding the signing key.
    pub tokens: TokenService,
    /// API configuration.
    pub config: ApiConfig,
}

/// Run embedded database migrations.
///
/// Delegates to `signin_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    signin_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public = Router::new()
        .route("/signup", post(auth::sign_up_handler))
        .route("/login", post(auth::login_handler))
        .route("/forgot-password", post(auth::forgot_password_handler))
        .route("/reset-password", post(auth::reset_password_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route("/me", get(account::me_handler))
        .route("/delete", delete(account::delete_account_handler))
        .route("/password", put(account::change_password_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    // Admin routes: the identity gate runs first, then the role check.
    let admin = Router::new()
        .route("/admin/users", get(admin::list_users_handler))
        .route_layer(axum::middleware::from_fn(middleware::auth::require_admin))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
