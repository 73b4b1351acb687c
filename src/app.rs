use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{self, Authenticator};
use crate::config::{AppConfig, SecurityConfig};
use crate::handlers::{protected, public};
use crate::middleware::{error_details, require_auth};
use crate::store::Store;

/// Shared by every handler; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    /// Uses the authenticator selected by the configuration.
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let auth = auth::from_config(&config, store.clone());
        Self::with_authenticator(config, store, auth)
    }

    pub fn with_authenticator(config: AppConfig, store: Arc<dyn Store>, auth: Arc<dyn Authenticator>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            auth,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/auth/token", post(public::auth::token))
        .route("/side-effect-types", get(public::side_effects::list))
        .route("/side-effect-types/category/:category", get(public::side_effects::by_category));

    let protected_api = Router::new()
        .route("/user", get(protected::user::show))
        .route("/auth/revoke", post(protected::user::revoke))
        .route(
            "/medications",
            get(protected::medications::list).post(protected::medications::create),
        )
        .route(
            "/medications/:id",
            get(protected::medications::show)
                .put(protected::medications::update)
                .patch(protected::medications::update)
                .delete(protected::medications::destroy),
        )
        .route(
            "/medications/:id/patterns",
            get(protected::patterns::list).post(protected::patterns::create),
        )
        .route(
            "/medications/:id/patterns/:pattern_id",
            get(protected::patterns::show)
                .put(protected::patterns::update)
                .patch(protected::patterns::update)
                .delete(protected::patterns::destroy),
        )
        .route(
            "/medication-logs",
            get(protected::logs::list).post(protected::logs::create),
        )
        .route(
            "/medication-logs/:id",
            get(protected::logs::show)
                .put(protected::logs::update)
                .patch(protected::logs::update)
                .delete(protected::logs::destroy),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(public::health::root))
        .route("/health", get(public::health::health))
        .nest("/api", public_api.merge(protected_api))
        .layer(middleware::from_fn_with_state(state.clone(), error_details))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors_layer(&state.config.security))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
