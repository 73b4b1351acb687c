use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{AuthError, Authenticator, TokenGrant};
use crate::config::AuthStrategy;
use crate::models::CurrentUser;
use crate::store::Store;
use crate::validation::Validator;

pub const TEST_USER_EMAIL: &str = "test@example.com";
pub const TEST_USER_NAME: &str = "Test User";

/// Development strategy: any token with the configured prefix is the shared
/// test user. No external calls.
pub struct DummyAuthenticator {
    prefix: String,
    store: Arc<dyn Store>,
}

impl DummyAuthenticator {
    pub fn new(prefix: &str, store: Arc<dyn Store>) -> Self {
        Self {
            prefix: prefix.to_string(),
            store,
        }
    }
}

#[async_trait]
impl Authenticator for DummyAuthenticator {
    fn strategy(&self) -> AuthStrategy {
        AuthStrategy::Dummy
    }

    async fn exchange(&self, body: &Map<String, Value>) -> Result<TokenGrant, AuthError> {
        let mut v = Validator::new(body);
        let external_id = v.required_string("supabase_user_id", 255);
        let email = v.email("email");
        v.string("name", 255);
        v.finish()?;

        let (Some(external_id), Some(_)) = (external_id, email) else {
            return Err(AuthError::MissingCredentials);
        };

        // Every dummy token resolves to the test user, so that is who the
        // grant describes.
        let user = self
            .store
            .find_or_create_user(TEST_USER_EMAIL, TEST_USER_NAME, None)
            .await?;
        let token = format!("{}{}_{}", self.prefix, Utc::now().timestamp(), external_id);

        Ok(TokenGrant {
            user,
            token,
            token_type: "Bearer",
            expires_at: None,
        })
    }

    async fn resolve(&self, token: &str) -> Result<CurrentUser, AuthError> {
        if !token.starts_with(&self.prefix) {
            return Err(AuthError::InvalidToken("not a dummy token".to_string()));
        }
        let user = self
            .store
            .find_or_create_user(TEST_USER_EMAIL, TEST_USER_NAME, None)
            .await?;
        Ok(CurrentUser::from_user(&user, None))
    }

    async fn revoke(&self, _user: &CurrentUser) -> Result<(), AuthError> {
        // Dummy tokens carry no server-side state.
        Ok(())
    }
}
