use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;

/// Errors that can occur during external service communication
#[derive(Debug)]
pub enum ConnectorError {
    /// HTTP request/response error
    HttpError(String),
    /// Service unreachable or timeout
    ServiceUnavailable(String),
    /// Invalid response format from external service
    InvalidResponse(String),
    /// Authentication error (401/403)
    Unauthorized(String),
    /// Connector is missing credentials or settings
    NotConfigured(String),
    /// Internal error in connector
    Internal(String),
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            Self::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::NotConfigured(msg) => write!(f, "Not configured: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ConnectorError {}

// Connectors surface to clients through ApiError; this mapping only applies
// when a handler returns ConnectorError directly.
impl ResponseError for ConnectorError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string(),
        }))
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::ServiceUnavailable(format!("Request timeout: {}", err))
        } else if err.is_connect() {
            Self::ServiceUnavailable(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

/// Turns a non-2xx upstream response into a ConnectorError, keeping the
/// upstream's own error message when it sends one.
pub(crate) async fn error_for_response(service: &str, resp: reqwest::Response) -> ConnectorError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = upstream_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    });

    match status.as_u16() {
        401 | 403 => ConnectorError::Unauthorized(format!("{}: {}", service, message)),
        502..=504 => ConnectorError::ServiceUnavailable(format!("{}: {}", service, message)),
        _ => ConnectorError::HttpError(format!("{} returned {}: {}", service, status, message)),
    }
}

/// Known shapes: `{"error": {"message": ..}}`, `{"error": ".."}`, `{"message": ..}`,
/// OCR.space `{"ErrorMessage": [..]}`.
fn upstream_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let candidates = [
        value.pointer("/error/message"),
        value.get("error"),
        value.get("message"),
        value.pointer("/ErrorMessage/0"),
        value.get("ErrorMessage"),
    ];
    let message = candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::to_string));
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_reads_nested_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid"}}"#;
        assert_eq!(upstream_message(body).as_deref(), Some("API key not valid"));
    }

    #[test]
    fn upstream_message_reads_flat_variants() {
        assert_eq!(
            upstream_message(r#"{"error":"quota"}"#).as_deref(),
            Some("quota")
        );
        assert_eq!(
            upstream_message(r#"{"ErrorMessage":["bad image"]}"#).as_deref(),
            Some("bad image")
        );
        assert_eq!(upstream_message("not json"), None);
    }
}
