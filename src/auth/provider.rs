use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::AuthError;
use crate::config::AppConfig;

/// What the external identity provider says about a credential.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderIdentity {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

impl ProviderIdentity {
    /// Stand-in identity for the development shortcuts.
    pub fn placeholder() -> Self {
        Self {
            id: "test-user-id".to_string(),
            email: "test@example.com".to_string(),
            name: Some("Test User".to_string()),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<ProviderIdentity, AuthError>;
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    name: Option<String>,
}

/// Body of `GET /auth/v1/user`, also the payload shape of provider JWTs.
#[derive(Debug, Default, Deserialize)]
struct ProviderUser {
    #[serde(alias = "sub")]
    id: Option<String>,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

/// Supabase-style provider reached over HTTP.
pub struct SupabaseProvider {
    client: reqwest::Client,
    base_url: Option<Url>,
    service_key: Option<String>,
    dev_shortcuts: bool,
}

impl SupabaseProvider {
    pub fn new(base_url: Option<Url>, service_key: Option<String>, dev_shortcuts: bool) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            service_key,
            dev_shortcuts,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let base_url = config.auth.provider_url.as_deref().and_then(|raw| match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(url = raw, error = %e, "ignoring unparsable identity provider url");
                None
            }
        });
        Self::new(
            base_url,
            config.auth.provider_service_key.clone(),
            !config.environment.is_production(),
        )
    }

    /// Outside production a provider JWT is read without verification and
    /// the literal `test_token` stands for the placeholder identity.
    fn shortcut(&self, credential: &str) -> Option<ProviderIdentity> {
        if !self.dev_shortcuts {
            return None;
        }
        if credential.starts_with("eyJ") {
            return Some(match read_unverified(credential) {
                Some(user) => {
                    let fallback = ProviderIdentity::placeholder();
                    ProviderIdentity {
                        id: user.id.unwrap_or(fallback.id),
                        email: user.email.unwrap_or(fallback.email),
                        name: user.user_metadata.name.or(fallback.name),
                    }
                }
                None => {
                    tracing::debug!("unreadable development jwt, using placeholder identity");
                    ProviderIdentity::placeholder()
                }
            });
        }
        if credential == "test_token" {
            return Some(ProviderIdentity::placeholder());
        }
        None
    }
}

fn read_unverified(token: &str) -> Option<ProviderUser> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    decode::<ProviderUser>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .ok()
}

#[async_trait]
impl IdentityProvider for SupabaseProvider {
    async fn verify(&self, credential: &str) -> Result<ProviderIdentity, AuthError> {
        if let Some(identity) = self.shortcut(credential) {
            return Ok(identity);
        }

        let (Some(base_url), Some(service_key)) = (&self.base_url, &self.service_key) else {
            tracing::warn!("identity provider is not configured");
            return Err(AuthError::Rejected("identity provider is not configured".to_string()));
        };
        let endpoint = base_url
            .join("auth/v1/user")
            .map_err(|e| AuthError::Rejected(e.to_string()))?;

        let response = self
            .client
            .get(endpoint)
            .header(AUTHORIZATION, format!("Bearer {credential}"))
            .header("apikey", service_key)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "identity provider unreachable");
                AuthError::Rejected(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected(format!("provider answered {}", response.status())));
        }

        let user: ProviderUser = response
            .json()
            .await
            .map_err(|e| AuthError::Rejected(e.to_string()))?;
        match (user.id, user.email) {
            (Some(id), Some(email)) => Ok(ProviderIdentity {
                id,
                email,
                name: user.user_metadata.name,
            }),
            _ => Err(AuthError::Rejected("provider user lacks id or email".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn provider(dev: bool) -> SupabaseProvider {
        SupabaseProvider::new(None, None, dev)
    }

    #[tokio::test]
    async fn development_jwt_is_read_without_verification() {
        let token = encode(
            &Header::default(),
            &json!({ "sub": "abc-123", "email": "dev@example.com", "user_metadata": { "name": "Dev" }, "aud": "authenticated" }),
            &EncodingKey::from_secret(b"whatever"),
        )
        .unwrap();
        let identity = provider(true).verify(&token).await.unwrap();
        assert_eq!(identity.id, "abc-123");
        assert_eq!(identity.email, "dev@example.com");
        assert_eq!(identity.name.as_deref(), Some("Dev"));
    }

    #[tokio::test]
    async fn malformed_development_jwt_falls_back_to_placeholder() {
        let identity = provider(true).verify("eyJnot-a-jwt").await.unwrap();
        assert_eq!(identity, ProviderIdentity::placeholder());
        let identity = provider(true).verify("test_token").await.unwrap();
        assert_eq!(identity, ProviderIdentity::placeholder());
    }

    #[tokio::test]
    async fn unconfigured_provider_rejects() {
        assert!(matches!(provider(false).verify("test_token").await, Err(AuthError::Rejected(_))));
        assert!(matches!(provider(true).verify("opaque").await, Err(AuthError::Rejected(_))));
    }
}
