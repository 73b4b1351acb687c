use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::filter::{Page, PageMeta};

/// Success envelope: `{ success: true, data?, message?, meta? }`.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub message: Option<String>,
    pub meta: Option<PageMeta>,
    pub status_code: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            message: None,
            meta: None,
            status_code: StatusCode::OK,
        }
    }

    /// 201 Created
    pub fn created(data: T) -> Self {
        Self {
            status_code: StatusCode::CREATED,
            ..Self::success(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    pub fn paginated(page: Page<T>) -> Self {
        Self {
            meta: Some(page.meta),
            ..Self::success(page.items)
        }
    }
}

impl ApiResponse<()> {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            data: None,
            message: Some(message.into()),
            meta: None,
            status_code: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let mut envelope = Map::new();
        envelope.insert("success".to_string(), Value::Bool(true));

        if let Some(data) = &self.data {
            match serde_json::to_value(data) {
                Ok(value) => {
                    envelope.insert("data".to_string(), value);
                }
                Err(e) => {
                    tracing::error!("Failed to serialize response data: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "success": false, "message": "Internal server error" })),
                    )
                        .into_response();
                }
            }
        }
        if let Some(message) = self.message {
            envelope.insert("message".to_string(), Value::String(message));
        }
        if let Some(meta) = self.meta {
            envelope.insert("meta".to_string(), json!(meta));
        }

        (self.status_code, Json(Value::Object(envelope))).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PageRequest;

    async fn body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn created_carries_data_and_message() {
        let response = ApiResponse::created(json!({ "id": 1 }))
            .with_message("Medication created successfully")
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["id"], 1);
        assert_eq!(body["message"], "Medication created successfully");
        assert!(body.get("meta").is_none());
    }

    #[tokio::test]
    async fn paginated_reports_meta() {
        let page = Page::new(vec![1, 2], PageRequest { page: 1, per_page: 2 }, 5);
        let body = body(ApiResponse::paginated(page).into_response()).await;
        assert_eq!(body["data"], json!([1, 2]));
        assert_eq!(body["meta"]["last_page"], 3);
        assert_eq!(body["meta"]["total"], 5);
    }

    #[tokio::test]
    async fn message_only_omits_data() {
        let body = body(ApiResponse::message_only("Token revoked").into_response()).await;
        assert!(body.get("data").is_none());
        assert_eq!(body["message"], "Token revoked");
    }
}
