use crate::connectors::ConnectorError;
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;

/// Every failure a handler can report. Mapped to a status code in one place.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed client input
    #[error("{0}")]
    Validation(String),
    /// An external service (LLM, storage, OCR, remote URL) failed
    #[error("{0}")]
    Upstream(String),
    /// The database failed
    #[error("{0}")]
    Persistence(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string(),
        }))
    }
}

impl From<ConnectorError> for ApiError {
    fn from(err: ConnectorError) -> Self {
        Self::Upstream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Upstream("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Persistence("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn body_is_single_error_string() {
        let response = ApiError::validation("userId is required").error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({"error": "userId is required"}));
    }

    #[test]
    fn connector_errors_become_upstream() {
        let err: ApiError = ConnectorError::HttpError("boom".into()).into();
        assert!(matches!(err, ApiError::Upstream(ref m) if m == "HTTP error: boom"));
    }
}
