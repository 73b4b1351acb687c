// HTTP API Error Types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::store::StoreError;
use crate::validation::ValidationErrors;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug, Clone)]
pub enum ApiError {
    // 400 Bad Request (malformed identifier or JSON)
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 422 Unprocessable Entity
    UnprocessableEntity {
        message: String,
        errors: ValidationErrors,
    },

    // 500 Internal Server Error
    InternalServerError {
        message: String,
        detail: Option<String>,
    },

    // 503 Service Unavailable
    ServiceUnavailable {
        message: String,
        detail: Option<String>,
    },
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::UnprocessableEntity { message, .. } => message,
            ApiError::InternalServerError { message, .. } => message,
            ApiError::ServiceUnavailable { message, .. } => message,
        }
    }

    /// Underlying failure text, only ever shown when diagnostics are enabled.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::InternalServerError { detail, .. }
            | ApiError::ServiceUnavailable { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self, include_detail: bool) -> Value {
        let mut body = json!({
            "success": false,
            "message": self.message(),
        });

        if let ApiError::UnprocessableEntity { errors, .. } = self {
            body["errors"] = json!(errors);
        }

        if include_detail {
            if let Some(detail) = self.detail() {
                body["error"] = json!(detail);
            }
        }

        body
    }

    /// Render with or without the `error` diagnostics field.
    pub fn render(&self, include_detail: bool) -> Response {
        (self.status_code(), Json(self.to_json(include_detail))).into_response()
    }

    /// Replace the generic message of a server-side failure with an
    /// operation-specific one; client errors keep theirs.
    pub fn while_doing(self, what: &str) -> Self {
        match self {
            ApiError::InternalServerError { detail, .. } => ApiError::InternalServerError {
                message: what.to_string(),
                detail,
            },
            other => other,
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        ApiError::UnprocessableEntity {
            message: "The given data was invalid.".to_string(),
            errors,
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            message: "Internal server error".to_string(),
            detail: Some(detail.into()),
        }
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable {
            message: "Service temporarily unavailable".to_string(),
            detail: Some(detail.into()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.detail() {
            Some(detail) => write!(f, "{}: {}", self.message(), detail),
            None => write!(f, "{}", self.message()),
        }
    }
}

impl std::error::Error for ApiError {}

/// Attach an operation-specific message to server-side failures.
pub trait ResultExt<T> {
    fn while_doing(self, what: &str) -> Result<T, ApiError>;
}

impl<T, E: Into<ApiError>> ResultExt<T> for Result<T, E> {
    fn while_doing(self, what: &str) -> Result<T, ApiError> {
        self.map_err(|e| e.into().while_doing(what))
    }
}

// Conversion from lower layers
impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::validation(errors)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(entity) => ApiError::not_found(format!("{} not found", entity)),
            StoreError::Invalid(errors) => ApiError::validation(errors),
            StoreError::Conflict(msg) => ApiError::conflict(msg),
            StoreError::Unavailable(detail) => ApiError::unavailable(detail),
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::unauthorized("Unauthorized"),
            AuthError::InvalidToken(_) | AuthError::Rejected(_) => ApiError::unauthorized("Invalid token"),
            AuthError::Invalid(errors) => ApiError::validation(errors),
            AuthError::Store(store) => ApiError::from(store),
            AuthError::Token(e) => ApiError::internal(format!("token signing failed: {}", e)),
            AuthError::SessionLifetime(hours) => {
                ApiError::internal(format!("session lifetime of {} hours is out of range", hours))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!(detail = self.detail().unwrap_or(""), "{}", self.message());
        }

        // The diagnostics middleware swaps in a detailed body when enabled.
        let mut response = self.render(false);
        response.extensions_mut().insert(self);
        response
    }
}
