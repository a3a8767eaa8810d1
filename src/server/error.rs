use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{ IntoResponse, Response },
    Json,
};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::llm::chat::ProviderError;
use crate::llm::ProviderKind;
use crate::mock::MockError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Not found")]
    NotFound,
    #[error("{0}")]
    ProviderUnavailable(String),
    #[error("{provider} API error")]
    Upstream {
        provider: ProviderKind,
        status: u16,
        body: String,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream { status, .. } =>
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Upstream { status: upstream, body, .. } =>
                json!({
                    "error": self.to_string(),
                    "status": upstream,
                    "body": body,
                }),
            ApiError::Internal(detail) => {
                error!("Internal server error: {}", detail);
                json!({ "error": "Internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge("Request body too large".to_string());
        }
        ApiError::Validation(rejection.body_text())
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Upstream { provider, status, body } =>
                ApiError::Upstream { provider, status, body },
            ProviderError::MissingCredential(kind) =>
                ApiError::ProviderUnavailable(format!("{} API key is not configured", kind)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<MockError> for ApiError {
    fn from(err: MockError) -> Self {
        ApiError::Validation(err.to_string())
    }
}
