use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::error::ApiError;

/// Re-renders error responses with their `error` detail when the
/// configuration allows it. Production configs never do.
pub async fn error_details(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    match response.extensions_mut().remove::<ApiError>() {
        Some(err) if state.config.api.expose_error_details => err.render(true),
        _ => response,
    }
}
