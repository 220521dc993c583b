//! Admin-only handlers.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::models::AccountSummary;
use crate::services::auth;

/// `GET /admin/users` — list every account.
pub async fn list_users_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<AccountSummary>>> {
    let users = auth::list_accounts(state.store.as_ref()).await?;
    Ok(Json(users))
}
