//! Authentication request handlers.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{
    ApiJson, ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, MessageResponse,
    ResetPasswordRequest, SignUpRequest, TokenResponse,
};
use crate::services::auth;

/// `POST /signup` — create a new user account.
pub async fn sign_up_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignUpRequest>,
) -> AppResult<Json<MessageResponse>> {
    auth::sign_up(
        state.store.as_ref(),
        &body.email,
        &body.username,
        &body.password,
    )
    .await?;
    Ok(Json(MessageResponse::new("user created successfully")))
}

/// `POST /login` — authenticate with username or email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let identifier = body
        .username
        .as_deref()
        .filter(|u| !u.is_empty())
        .or(body.email.as_deref())
        .unwrap_or_default();
    let token = auth::login(
        state.store.as_ref(),
        &state.tokens,
        &state.config,
        identifier,
        &body.password,
    )
    .await?;
    Ok(Json(TokenResponse { token }))
}

/// `POST /forgot-password` — start a password reset.
pub async fn forgot_password_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> AppResult<Json<ForgotPasswordResponse>> {
    let resp = auth::forgot_password(state.store.as_ref(), &state.config, &body.email).await?;
    Ok(Json(resp))
}

/// `POST /reset-password` — exchange a reset token for a new password.
pub async fn reset_password_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    auth::reset_password(state.store.as_ref(), &body.token, &body.password).await?;
    Ok(Json(MessageResponse::new("password reset successful")))
}
