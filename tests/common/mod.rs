#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use medtrack_api::auth::{AuthError, DelegatedAuthenticator, IdentityProvider, ProviderIdentity, SessionKeys};
use medtrack_api::config::{AppConfig, AuthStrategy};
use medtrack_api::store::MemoryStore;
use medtrack_api::{router, AppState};

/// Any token with this prefix is the shared test user under dummy auth.
pub const DUMMY_TOKEN: &str = "dummy_token_1700000000_test";

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

/// Development config, dummy auth, seeded in-memory store.
pub fn app() -> Router {
    let config = AppConfig::development();
    router(AppState::new(config, Arc::new(MemoryStore::new())))
}

/// Accepts any credential except `"bad"`; credential `alice` is
/// `alice@example.com`.
pub struct StubProvider;

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn verify(&self, credential: &str) -> Result<ProviderIdentity, AuthError> {
        if credential == "bad" {
            return Err(AuthError::Rejected("unknown credential".to_string()));
        }
        Ok(ProviderIdentity {
            id: format!("ext-{credential}"),
            email: format!("{credential}@example.com"),
            name: None,
        })
    }
}

/// Delegated auth backed by [`StubProvider`], for tests that need more than
/// one user.
pub fn delegated_app() -> Router {
    let mut config = AppConfig::development();
    config.auth.strategy = AuthStrategy::Delegated;
    let store = Arc::new(MemoryStore::new());
    let keys = SessionKeys::new(&config.auth.session_secret, config.auth.session_ttl_hours);
    let auth = Arc::new(DelegatedAuthenticator::new(Arc::new(StubProvider), store.clone(), keys));
    router(AppState::with_authenticator(config, store, auth))
}

pub async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Response> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };
    send_request(app, request).await
}

pub async fn send_raw(app: &Router, method: Method, uri: &str, token: &str, raw: &'static str) -> Result<Response> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(raw))?;
    send_request(app, request).await
}

async fn send_request(app: &Router, request: Request<Body>) -> Result<Response> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok(Response { status, body })
}

pub async fn get(app: &Router, uri: &str, token: &str) -> Result<Response> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post(app: &Router, uri: &str, token: &str, body: Value) -> Result<Response> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn patch(app: &Router, uri: &str, token: &str, body: Value) -> Result<Response> {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: &str) -> Result<Response> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Exchanges a stub credential for a session token on a [`delegated_app`].
pub async fn login(app: &Router, who: &str) -> Result<String> {
    let res = send(
        app,
        Method::POST,
        "/api/auth/token",
        None,
        Some(serde_json::json!({ "access_token": who })),
    )
    .await?;
    anyhow::ensure!(res.status == StatusCode::OK, "login failed: {}", res.body);
    res.body["data"]["token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("no token in {}", res.body))
}

/// Creates a medication and returns its id.
pub async fn create_medication(app: &Router, token: &str, body: Value) -> Result<String> {
    let res = post(app, "/api/medications", token, body).await?;
    anyhow::ensure!(res.status == StatusCode::CREATED, "create failed: {}", res.body);
    id_of(&res.body)
}

pub fn id_of(body: &Value) -> Result<String> {
    body["data"]["id"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("no id in {}", body))
}

pub fn names(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
