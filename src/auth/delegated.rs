use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{AuthError, Authenticator, Claims, IdentityProvider, SessionKeys, TokenGrant};
use crate::config::AuthStrategy;
use crate::models::{CurrentUser, Session};
use crate::store::{Store, StoreError};
use crate::validation::Validator;

/// Production strategy. A provider credential is exchanged once for a
/// locally signed session token; later requests never call the provider.
pub struct DelegatedAuthenticator {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn Store>,
    keys: SessionKeys,
}

impl DelegatedAuthenticator {
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn Store>, keys: SessionKeys) -> Self {
        Self { provider, store, keys }
    }
}

fn rejected_lookup(err: StoreError) -> AuthError {
    match err {
        StoreError::NotFound(what) => AuthError::InvalidToken(format!("{what} not found")),
        other => AuthError::Store(other),
    }
}

#[async_trait]
impl Authenticator for DelegatedAuthenticator {
    fn strategy(&self) -> AuthStrategy {
        AuthStrategy::Delegated
    }

    async fn exchange(&self, body: &Map<String, Value>) -> Result<TokenGrant, AuthError> {
        let mut v = Validator::new(body);
        let credential = v.required_string("access_token", 8192);
        v.finish()?;
        let credential = credential.ok_or(AuthError::MissingCredentials)?;

        let identity = self.provider.verify(&credential).await?;
        let name = identity.name.clone().unwrap_or_else(|| identity.email.clone());
        let user = self
            .store
            .find_or_create_user(&identity.email, &name, Some(&identity.id))
            .await?;

        let expires_at = self.keys.expiry_from(Utc::now())?;
        let session = self.store.create_session(Session::new(user.id, expires_at)).await?;
        let token = self.keys.issue(&Claims::new(user.id, session.id, expires_at))?;
        tracing::info!(user_id = %user.id, session_id = %session.id, "session issued");

        Ok(TokenGrant {
            user,
            token,
            token_type: "Bearer",
            expires_at: Some(expires_at),
        })
    }

    async fn resolve(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let claims = self.keys.verify(token)?;
        let session = self.store.get_session(claims.sid).await.map_err(rejected_lookup)?;
        if session.user_id != claims.sub || !session.is_live(Utc::now()) {
            return Err(AuthError::InvalidToken("session is no longer live".to_string()));
        }
        let user = self.store.get_user(claims.sub).await.map_err(rejected_lookup)?;
        Ok(CurrentUser::from_user(&user, Some(session.id)))
    }

    async fn revoke(&self, user: &CurrentUser) -> Result<(), AuthError> {
        if let Some(session_id) = user.session_id {
            self.store.revoke_session(session_id).await?;
            tracing::info!(user_id = %user.id, %session_id, "session revoked");
        }
        Ok(())
    }
}
