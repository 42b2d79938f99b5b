use super::config::{http_client, OcrConfig};
use super::errors::{error_for_response, ConnectorError};
use crate::models::UploadedFile;
use actix_web::web;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;

/// Optical character recognition: image bytes in, text out
#[async_trait::async_trait]
pub trait OcrConnector: Send + Sync {
    async fn recognize(&self, file: &UploadedFile) -> Result<String, ConnectorError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: Option<String>,
}

/// OCR.space responses, plus the plain `{"text": ..}` shape of simple OCR servers.
#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default, rename = "ParsedResults")]
    parsed_results: Vec<ParsedResult>,
    #[serde(default, rename = "IsErroredOnProcessing")]
    is_errored: bool,
    #[serde(default, rename = "ErrorMessage")]
    error_message: Option<Value>,
    #[serde(default)]
    text: Option<String>,
}

pub(crate) fn normalize_response(body: &str) -> Result<String, ConnectorError> {
    let raw: OcrResponse = serde_json::from_str(body)
        .map_err(|err| ConnectorError::InvalidResponse(format!("{}: {}", err, body)))?;

    if raw.is_errored {
        let message = match raw.error_message {
            Some(Value::String(message)) => message,
            Some(Value::Array(messages)) => messages
                .iter()
                .filter_map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            _ => "OCR processing failed".to_string(),
        };
        return Err(ConnectorError::InvalidResponse(message));
    }

    if let Some(text) = raw.text {
        return Ok(text);
    }

    Ok(raw
        .parsed_results
        .into_iter()
        .filter_map(|result| result.parsed_text)
        .collect::<Vec<_>>()
        .join("\n"))
}

/// OCR.space compatible client
pub struct OcrSpaceClient {
    endpoint: String,
    language: String,
    http_client: reqwest::Client,
    api_key: Option<String>,
}

impl OcrSpaceClient {
    pub fn new(config: OcrConfig) -> Result<Self, ConnectorError> {
        let http_client = http_client(config.timeout_secs)
            .map_err(|err| ConnectorError::Internal(format!("HTTP client error: {}", err)))?;

        Ok(Self {
            endpoint: format!("{}/parse/image", config.base_url.trim_end_matches('/')),
            language: config.language,
            http_client,
            api_key: config.api_key,
        })
    }
}

#[async_trait::async_trait]
impl OcrConnector for OcrSpaceClient {
    async fn recognize(&self, file: &UploadedFile) -> Result<String, ConnectorError> {
        let span = tracing::info_span!("ocr_recognize", file_name = %file.file_name, size = file.len());

        let mut part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone());
        if !file.content_type.is_empty() {
            part = part.mime_str(&file.content_type).map_err(|err| {
                ConnectorError::Internal(format!("invalid content type: {}", err))
            })?;
        }
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("language", self.language.clone());

        let mut req = self.http_client.post(&self.endpoint).multipart(form);
        if let Some(api_key) = &self.api_key {
            req = req.header("apikey", api_key);
        }

        let resp = req.send().instrument(span.clone()).await.map_err(|err| {
            tracing::error!(parent: &span, "OCR request failed: {:?}", err);
            ConnectorError::from(err)
        })?;

        if !resp.status().is_success() {
            return Err(error_for_response("OCR", resp).await);
        }

        let body = resp.text().await?;
        normalize_response(&body)
    }
}

pub mod mock {
    use super::*;

    /// Returns a fixed text for every image.
    #[derive(Default)]
    pub struct MockOcrConnector {
        text: String,
    }

    impl MockOcrConnector {
        pub fn new(text: impl Into<String>) -> Self {
            Self { text: text.into() }
        }
    }

    #[async_trait::async_trait]
    impl OcrConnector for MockOcrConnector {
        async fn recognize(&self, _file: &UploadedFile) -> Result<String, ConnectorError> {
            Ok(self.text.clone())
        }
    }
}

pub fn init(connector_config: &super::config::ConnectorConfig) -> web::Data<Arc<dyn OcrConnector>> {
    let client = connector_config
        .ocr
        .as_ref()
        .filter(|c| c.enabled)
        .map(|config| OcrSpaceClient::new(config.clone()));

    let connector: Arc<dyn OcrConnector> = match client {
        Some(Ok(client)) => {
            tracing::info!("Initializing OCR connector");
            Arc::new(client)
        }
        Some(Err(err)) => {
            tracing::error!("Failed to initialize OCR connector: {} - using mock", err);
            Arc::new(mock::MockOcrConnector::default())
        }
        None => {
            tracing::warn!("OCR connector disabled - images will yield no text");
            Arc::new(mock::MockOcrConnector::default())
        }
    };
    web::Data::new(connector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_parsed_results() {
        let body = r#"{"ParsedResults":[{"ParsedText":"line one"},{"ParsedText":"line two"}],"OCRExitCode":1,"IsErroredOnProcessing":false}"#;
        assert_eq!(normalize_response(body).unwrap(), "line one\nline two");
    }

    #[test]
    fn plain_text_shape() {
        assert_eq!(normalize_response(r#"{"text":"hello"}"#).unwrap(), "hello");
    }

    #[test]
    fn processing_error_is_reported() {
        let body = r#"{"IsErroredOnProcessing":true,"ErrorMessage":["File failed validation","Bad type"]}"#;
        match normalize_response(body) {
            Err(ConnectorError::InvalidResponse(message)) => {
                assert_eq!(message, "File failed validation; Bad type")
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
