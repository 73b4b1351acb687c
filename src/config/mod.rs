use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_per_page: u32,
    pub max_per_page: u32,
    /// Include internal error text in the `error` field of 5xx responses.
    pub expose_error_details: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    /// Any `dummy_token_*` bearer maps to the shared test identity.
    Dummy,
    /// External credentials are verified by the identity provider and
    /// exchanged for locally signed session tokens.
    Delegated,
}

impl FromStr for AuthStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dummy" => Ok(AuthStrategy::Dummy),
            "delegated" | "supabase" => Ok(AuthStrategy::Delegated),
            other => Err(format!("unknown auth strategy '{}'", other)),
        }
    }
}

/// Upper bound for `AUTH_SESSION_TTL_HOURS`: one year.
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 366;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub strategy: AuthStrategy,
    pub dummy_token_prefix: String,
    #[serde(skip_serializing)]
    pub session_secret: String,
    pub session_ttl_hours: u64,
    pub provider_url: Option<String>,
    #[serde(skip_serializing)]
    pub provider_service_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        if let Some(v) = env_parse("PORT") {
            self.server.port = v;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = env_parse("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v;
        }
        if let Some(v) = env_parse("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v;
        }

        // API overrides
        if let Some(v) = env_parse("API_DEFAULT_PER_PAGE") {
            self.api.default_per_page = v;
        }
        if let Some(v) = env_parse("API_MAX_PER_PAGE") {
            self.api.max_per_page = v;
        }
        if let Some(v) = env_parse("API_EXPOSE_ERROR_DETAILS") {
            self.api.expose_error_details = v;
        }
        if let Some(v) = env_parse("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v;
        }

        // Auth overrides
        if let Some(v) = env_parse("AUTH_STRATEGY") {
            self.auth.strategy = v;
        }
        if let Ok(v) = env::var("AUTH_DUMMY_TOKEN_PREFIX") {
            self.auth.dummy_token_prefix = v;
        }
        if let Ok(v) = env::var("AUTH_SESSION_SECRET") {
            self.auth.session_secret = v;
        }
        if let Some(v) = env_parse("AUTH_SESSION_TTL_HOURS") {
            self.auth.session_ttl_hours = v;
        }
        if let Ok(v) = env::var("SUPABASE_URL") {
            self.auth.provider_url = Some(v);
        }
        if let Ok(v) = env::var("SUPABASE_SERVICE_KEY") {
            self.auth.provider_service_key = Some(v);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self
    }

    /// Rejects combinations the server must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.default_per_page == 0 || self.api.max_per_page == 0 {
            return Err(ConfigError::Invalid("page sizes must be positive".to_string()));
        }
        if self.api.default_per_page > self.api.max_per_page {
            return Err(ConfigError::Invalid(format!(
                "default page size {} exceeds maximum {}",
                self.api.default_per_page, self.api.max_per_page
            )));
        }
        if self.environment.is_production() {
            if self.api.expose_error_details {
                return Err(ConfigError::Invalid(
                    "error details cannot be exposed in production".to_string(),
                ));
            }
            if self.auth.strategy == AuthStrategy::Dummy {
                return Err(ConfigError::Invalid(
                    "the dummy auth strategy is not available in production".to_string(),
                ));
            }
        }
        if self.auth.session_ttl_hours == 0 || self.auth.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(ConfigError::Invalid(format!(
                "session lifetime must be between 1 and {} hours, got {}",
                MAX_SESSION_TTL_HOURS, self.auth.session_ttl_hours
            )));
        }
        if self.auth.strategy == AuthStrategy::Delegated && self.auth.session_secret.is_empty() {
            return Err(ConfigError::MissingVar("AUTH_SESSION_SECRET"));
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                default_per_page: 15,
                max_per_page: 1000,
                expose_error_details: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            auth: AuthConfig {
                strategy: AuthStrategy::Dummy,
                dummy_token_prefix: "dummy_token_".to_string(),
                session_secret: "development-session-secret".to_string(),
                session_ttl_hours: 24 * 7, // 1 week
                provider_url: None,
                provider_service_key: None,
            },
            security: SecurityConfig {
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                default_per_page: 15,
                max_per_page: 500,
                expose_error_details: false,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            auth: AuthConfig {
                strategy: AuthStrategy::Delegated,
                dummy_token_prefix: "dummy_token_".to_string(),
                session_secret: String::new(),
                session_ttl_hours: 24,
                provider_url: None,
                provider_service_key: None,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                default_per_page: 15,
                max_per_page: 100,
                expose_error_details: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            auth: AuthConfig {
                strategy: AuthStrategy::Delegated,
                dummy_token_prefix: "dummy_token_".to_string(),
                session_secret: String::new(),
                session_ttl_hours: 4,
                provider_url: None,
                provider_service_key: None,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
