use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::{bearer_token, AuthError};
use crate::error::ApiError;

/// Resolves the bearer token and attaches the [`crate::models::CurrentUser`]
/// to the request before any protected handler runs.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Owned copies: the request itself must not be borrowed across the await.
    let token = bearer_token(
        request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
    )
    .map(str::to_owned);
    let path = request.uri().path().to_owned();

    let user = match token {
        Ok(token) => state.auth.resolve(&token).await,
        Err(e) => Err(e),
    }
    .map_err(|e| {
        match &e {
            AuthError::Store(_) | AuthError::Token(_) | AuthError::SessionLifetime(_) => {}
            _ => tracing::warn!(%path, reason = %e, "authentication failed"),
        }
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
