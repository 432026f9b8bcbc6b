//! Tagged error responses for the HTTP API

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{AuthError, ClassificationError, ExtractError, RewriteError, StoreError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Report not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::InvalidRequest(err.body_text())
        }
    }
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Auth(_) => "auth",
            ApiError::Classification(_) => "classification",
            ApiError::Rewrite(_) => "rewrite",
            ApiError::Store(_) => "store",
            ApiError::Extract(_) => "extract",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(AuthError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Classification(ClassificationError::EmptyText)
            | ApiError::Rewrite(RewriteError::EmptyText) => StatusCode::BAD_REQUEST,
            ApiError::Classification(_) | ApiError::Rewrite(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Extract(ExtractError::UnsupportedFormat(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ApiError::Extract(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Store(e) => {
                tracing::error!("Store error: {}", e);
                "Database error".to_string()
            }
            ApiError::Classification(e) if status == StatusCode::BAD_GATEWAY => {
                tracing::error!("Classification error: {}", e);
                e.to_string()
            }
            ApiError::Rewrite(e) if status == StatusCode::BAD_GATEWAY => {
                tracing::error!("Rewrite error: {}", e);
                e.to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "kind": self.kind(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ProviderError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(AuthError::MissingToken).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(ClassificationError::Provider(ProviderError::MissingContent)).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(ApiError::from(RewriteError::EmptyText).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(ExtractError::UnsupportedFormat("a.png".into())).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(ApiError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(
            ApiError::PayloadTooLarge("too big".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
