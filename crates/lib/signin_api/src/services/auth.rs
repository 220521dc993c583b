//! Authentication service — signup/login/reset flows delegating to `signin_core::auth`.

use signin_core::auth::jwt::TokenService;
use signin_core::auth::password::{
    check_password_length, dummy_verify_blocking, hash_password_blocking, is_bcrypt_hash,
    matches_legacy_plaintext, verify_password_blocking,
};
use signin_core::auth::store::CredentialStore;
use signin_core::auth::{AuthError, reset};
use signin_core::models::auth::{Account, NewAccount, Role};
use tracing::{info, warn};

use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};
use crate::models::{AccountSummary, ForgotPasswordResponse};

/// Message returned by `/forgot-password` whether or not the email is registered.
pub const FORGOT_PASSWORD_MESSAGE: &str = "If this email exists, a reset link was sent";

fn require_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Register a new `user` account.
pub async fn sign_up(
    store: &dyn CredentialStore,
    email: &str,
    username: &str,
    password: &str,
) -> AppResult<()> {
    require_non_empty("email", email)?;
    require_non_empty("username", username)?;
    require_non_empty("password", password)?;
    if !email.contains('@') {
        return Err(AppError::Validation("email is invalid".into()));
    }
    check_password_length(password)?;

    if store.exists(username, email).await? {
        return Err(AppError::Conflict("user already exists".into()));
    }

    let pw_hash = hash_password_blocking(password.to_string()).await?;

    // A racing signup can still lose here; the store reports it as a conflict.
    store
        .create_account(NewAccount {
            email,
            username,
            password_hash: &pw_hash,
            role: Role::User,
        })
        .await?;

    info!(username, "account created");
    Ok(())
}

/// Check `password` against the stored value of `account`.
///
/// Stored values that predate hashing are accepted only when legacy upgrades
/// are enabled, and are replaced with a bcrypt hash on success.
async fn check_password(
    store: &dyn CredentialStore,
    config: &ApiConfig,
    account: &Account,
    password: &str,
) -> AppResult<bool> {
    if is_bcrypt_hash(&account.password_hash) {
        return Ok(verify_password_blocking(password.to_string(), account.password_hash.clone()).await?);
    }

    if !config.upgrade_legacy_passwords {
        warn!(username = %account.username, "account has an unhashed password; legacy upgrade disabled");
        return Ok(false);
    }

    if !matches_legacy_plaintext(password, &account.password_hash) {
        return Ok(false);
    }

    let upgraded = hash_password_blocking(password.to_string()).await?;
    store.update_password(&account.email, &upgraded).await?;
    info!(username = %account.username, "legacy password upgraded to bcrypt");
    Ok(true)
}

/// Authenticate with a username or email plus password, returning a bearer token.
///
/// Unknown identifiers and wrong passwords produce the same error.
pub async fn login(
    store: &dyn CredentialStore,
    tokens: &TokenService,
    config: &ApiConfig,
    identifier: &str,
    password: &str,
) -> AppResult<String> {
    require_non_empty("username or email", identifier)?;

    let account = match store.find_by_identifier(identifier).await {
        Ok(account) => account,
        Err(AuthError::NotFound(_)) => {
            // Same bcrypt work as a wrong password, so timing does not reveal the account.
            dummy_verify_blocking(password.to_string()).await?;
            return Err(AuthError::CredentialError.into());
        }
        Err(e) => return Err(e.into()),
    };

    if !check_password(store, config, &account, password).await? {
        return Err(AuthError::CredentialError.into());
    }

    let token = tokens.issue(&account.username)?;
    info!(username = %account.username, "login succeeded");
    Ok(token)
}

/// Change the password of `username` after re-checking the current one.
pub async fn change_password(
    store: &dyn CredentialStore,
    config: &ApiConfig,
    username: &str,
    current_password: &str,
    new_password: &str,
) -> AppResult<()> {
    require_non_empty("new_password", new_password)?;
    check_password_length(new_password)?;

    let account = match store.find_by_username(username).await {
        Ok(account) => account,
        Err(AuthError::NotFound(_)) => return Err(AuthError::CredentialError.into()),
        Err(e) => return Err(e.into()),
    };

    if !check_password(store, config, &account, current_password).await? {
        return Err(AuthError::CredentialError.into());
    }

    let new_hash = hash_password_blocking(new_password.to_string()).await?;
    store.update_password(&account.email, &new_hash).await?;
    info!(username, "password changed");
    Ok(())
}

/// Delete the account `username`.
pub async fn delete_account(store: &dyn CredentialStore, username: &str) -> AppResult<()> {
    store.delete_by_username(username).await?;
    info!(username, "account deleted");
    Ok(())
}

/// Start a password reset for `email`.
///
/// The response is identical for registered and unknown emails, except that
/// the token is attached when `expose_reset_token` is enabled.
pub async fn forgot_password(
    store: &dyn CredentialStore,
    config: &ApiConfig,
    email: &str,
) -> AppResult<ForgotPasswordResponse> {
    require_non_empty("email", email)?;

    let token = reset::request_reset(store, email).await?;

    Ok(ForgotPasswordResponse {
        message: FORGOT_PASSWORD_MESSAGE.to_string(),
        reset_token: token.filter(|_| config.expose_reset_token),
    })
}

/// Complete a password reset.
pub async fn reset_password(
    store: &dyn CredentialStore,
    token: &str,
    new_password: &str,
) -> AppResult<()> {
    require_non_empty("password", new_password)?;
    check_password_length(new_password)?;
    reset::reset_password(store, token, new_password).await?;
    Ok(())
}

/// List every account for administrators.
pub async fn list_accounts(store: &dyn CredentialStore) -> AppResult<Vec<AccountSummary>> {
    let accounts = store.list_accounts().await?;
    Ok(accounts.into_iter().map(AccountSummary::from).collect())
}
