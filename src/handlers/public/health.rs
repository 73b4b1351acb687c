use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET /
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Medtrack API",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.config.environment,
            "auth": state.auth.strategy(),
            "endpoints": {
                "auth": "/api/auth/token (public), /api/auth/revoke, /api/user",
                "medications": "/api/medications[/:id]",
                "patterns": "/api/medications/:id/patterns[/:pattern_id]",
                "logs": "/api/medication-logs[/:id]",
                "side_effect_types": "/api/side-effect-types[/category/:category] (public)",
            }
        }
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Response {
    let now = chrono::Utc::now();
    let backend = state.store.backend();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "store": backend }
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(store = backend, error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "message": "Service temporarily unavailable",
                    "data": { "status": "degraded", "timestamp": now, "store": backend }
                })),
            )
                .into_response()
        }
    }
}
