use axum::extract::State;

use crate::app::AppState;
use crate::auth::TokenGrant;
use crate::middleware::{ApiResponse, ApiResult, JsonObject};

/// POST /api/auth/token
pub async fn token(State(state): State<AppState>, JsonObject(body): JsonObject) -> ApiResult<TokenGrant> {
    let grant = state.auth.exchange(&body).await?;
    tracing::info!(user_id = %grant.user.id, strategy = ?state.auth.strategy(), "token issued");
    Ok(ApiResponse::success(grant))
}
