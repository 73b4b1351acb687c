//! Bearer-token identity resolution.
//!
//! Exactly one [`Authenticator`] is active per deployment, chosen by
//! `AUTH_STRATEGY`. The resolved [`CurrentUser`] travels with the request as
//! an extension; nothing here keeps per-request global state.

pub mod delegated;
pub mod dummy;
pub mod provider;
pub mod token;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::{AppConfig, AuthStrategy};
use crate::models::{CurrentUser, User};
use crate::store::{Store, StoreError};
use crate::validation::ValidationErrors;

pub use delegated::DelegatedAuthenticator;
pub use dummy::DummyAuthenticator;
pub use provider::{IdentityProvider, ProviderIdentity, SupabaseProvider};
pub use token::{Claims, SessionKeys};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing or malformed bearer credentials")]
    MissingCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Identity provider rejected the credential: {0}")]
    Rejected(String),

    #[error("{0}")]
    Invalid(ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Token signing failed: {0}")]
    Token(jsonwebtoken::errors::Error),

    #[error("Session lifetime of {0} hours is out of range")]
    SessionLifetime(u64),
}

impl From<ValidationErrors> for AuthError {
    fn from(errors: ValidationErrors) -> Self {
        AuthError::Invalid(errors)
    }
}

/// Result of exchanging an external credential for a local bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct TokenGrant {
    pub user: User,
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    fn strategy(&self) -> AuthStrategy;

    /// `POST /auth/token`: validates the body and issues a local token.
    async fn exchange(&self, body: &Map<String, Value>) -> Result<TokenGrant, AuthError>;

    /// Maps a presented bearer token to its user.
    async fn resolve(&self, token: &str) -> Result<CurrentUser, AuthError>;

    /// Invalidates the token the user authenticated with, where supported.
    async fn revoke(&self, user: &CurrentUser) -> Result<(), AuthError>;
}

/// Builds the authenticator selected by `config.auth.strategy`.
pub fn from_config(config: &AppConfig, store: Arc<dyn Store>) -> Arc<dyn Authenticator> {
    match config.auth.strategy {
        AuthStrategy::Dummy => Arc::new(DummyAuthenticator::new(&config.auth.dummy_token_prefix, store)),
        AuthStrategy::Delegated => {
            let provider = SupabaseProvider::from_config(config);
            let keys = SessionKeys::new(&config.auth.session_secret, config.auth.session_ttl_hours);
            Arc::new(DelegatedAuthenticator::new(Arc::new(provider), store, keys))
        }
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.ok_or(AuthError::MissingCredentials)?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or(AuthError::MissingCredentials)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bearer_tokens() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(matches!(bearer_token(None), Err(AuthError::MissingCredentials)));
        assert!(matches!(bearer_token(Some("Basic abc")), Err(AuthError::MissingCredentials)));
        assert!(matches!(bearer_token(Some("Bearer   ")), Err(AuthError::MissingCredentials)));
    }
}
