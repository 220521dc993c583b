//! Handlers for the authenticated account.

use axum::extract::State;
use axum::{Extension, Json};
use signin_core::models::auth::Identity;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{ApiJson, ChangePasswordRequest, MeResponse, MessageResponse};
use crate::services::auth;

/// `GET /me` — the caller's identity.
pub async fn me_handler(Extension(identity): Extension<Identity>) -> Json<MeResponse> {
    Json(MeResponse::from(identity))
}

/// `DELETE /delete` — delete the caller's account.
pub async fn delete_account_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<MessageResponse>> {
    auth::delete_account(state.store.as_ref(), &identity.username).await?;
    Ok(Json(MessageResponse::new("account deleted successfully")))
}

/// `PUT /password` — change the caller's password.
pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    auth::change_password(
        state.store.as_ref(),
        &state.config,
        &identity.username,
        &body.current_password,
        &body.new_password,
    )
    .await?;
    Ok(Json(MessageResponse::new("password changed successfully")))
}
