use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::CurrentUser;

/// GET /api/user
pub async fn show(Extension(user): Extension<CurrentUser>) -> ApiResult<CurrentUser> {
    Ok(ApiResponse::success(user))
}

/// POST /api/auth/revoke
pub async fn revoke(State(state): State<AppState>, Extension(user): Extension<CurrentUser>) -> ApiResult<()> {
    state.auth.revoke(&user).await?;
    Ok(ApiResponse::message_only("Token revoked"))
}
