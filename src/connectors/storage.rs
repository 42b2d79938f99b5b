use super::config::{http_client, StorageConfig};
use super::errors::{error_for_response, ConnectorError};
use crate::models::UploadedFile;
use actix_web::web;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::Instrument;

/// Where an uploaded file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Public URL of the object
    pub url: String,
    pub public_id: Option<String>,
}

/// Object storage: upload bytes, get back a public URL
#[async_trait::async_trait]
pub trait StorageConnector: Send + Sync {
    async fn upload(&self, file: &UploadedFile) -> Result<StoredObject, ConnectorError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    secure_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    public_id: Option<String>,
}

pub(crate) fn normalize_response(body: &str) -> Result<StoredObject, ConnectorError> {
    let raw: UploadResponse = serde_json::from_str(body)
        .map_err(|err| ConnectorError::InvalidResponse(format!("{}: {}", err, body)))?;

    raw.secure_url
        .or(raw.url)
        .filter(|url| !url.is_empty())
        .map(|url| StoredObject {
            url,
            public_id: raw.public_id,
        })
        .ok_or_else(|| ConnectorError::InvalidResponse("upload response has no URL".to_string()))
}

/// Signature over the sorted, signed parameters followed by the API secret.
pub(crate) fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

struct Credentials {
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

/// Cloudinary signed upload client
pub struct CloudinaryClient {
    base_url: String,
    folder: String,
    http_client: reqwest::Client,
    credentials: Option<Credentials>,
}

impl CloudinaryClient {
    pub fn new(config: StorageConfig) -> Result<Self, ConnectorError> {
        let http_client = http_client(config.timeout_secs)
            .map_err(|err| ConnectorError::Internal(format!("HTTP client error: {}", err)))?;

        let credentials = match (config.cloud_name, config.api_key, config.api_secret) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(Credentials {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            folder: config.folder,
            http_client,
            credentials,
        })
    }
}

#[async_trait::async_trait]
impl StorageConnector for CloudinaryClient {
    async fn upload(&self, file: &UploadedFile) -> Result<StoredObject, ConnectorError> {
        let span = tracing::info_span!(
            "storage_upload",
            file_name = %file.file_name,
            size = file.len()
        );
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            ConnectorError::NotConfigured("storage credentials are not set".to_string())
        })?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signed = [
            ("folder", self.folder.clone()),
            ("timestamp", timestamp.clone()),
        ];
        let signature = sign(&signed, &credentials.api_secret);

        let mut part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone());
        if !file.content_type.is_empty() {
            part = part.mime_str(&file.content_type).map_err(|err| {
                ConnectorError::Internal(format!("invalid content type: {}", err))
            })?;
        }
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", credentials.api_key.clone())
            .text("folder", self.folder.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let url = format!(
            "{}/v1_1/{}/auto/upload",
            self.base_url, credentials.cloud_name
        );
        let resp = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .instrument(span.clone())
            .await
            .map_err(|err| {
                tracing::error!(parent: &span, "storage upload failed: {:?}", err);
                ConnectorError::from(err)
            })?;

        if !resp.status().is_success() {
            let err = error_for_response("Storage", resp).await;
            tracing::error!(parent: &span, "storage upload error: {}", err);
            return Err(err);
        }

        let body = resp.text().await?;
        let stored = normalize_response(&body)?;
        tracing::info!(parent: &span, url = %stored.url, "File stored");
        Ok(stored)
    }
}

pub mod mock {
    use super::*;

    /// Pretends to store files under `base_url`.
    pub struct MockStorageConnector {
        base_url: String,
        fail: bool,
    }

    impl MockStorageConnector {
        pub fn new(base_url: impl Into<String>) -> Self {
            Self {
                base_url: base_url.into(),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    impl Default for MockStorageConnector {
        fn default() -> Self {
            Self::new("http://localhost/uploads")
        }
    }

    #[async_trait::async_trait]
    impl StorageConnector for MockStorageConnector {
        async fn upload(&self, file: &UploadedFile) -> Result<StoredObject, ConnectorError> {
            if self.fail {
                return Err(ConnectorError::ServiceUnavailable(
                    "storage is down".to_string(),
                ));
            }
            let public_id = uuid::Uuid::new_v4().to_string();
            Ok(StoredObject {
                url: format!(
                    "{}/{}/{}",
                    self.base_url.trim_end_matches('/'),
                    public_id,
                    urlencoding::encode(&file.file_name)
                ),
                public_id: Some(public_id),
            })
        }
    }
}

pub fn init(
    connector_config: &super::config::ConnectorConfig,
) -> web::Data<Arc<dyn StorageConnector>> {
    let client = connector_config
        .storage
        .as_ref()
        .filter(|c| c.enabled)
        .map(|config| CloudinaryClient::new(config.clone()));

    let connector: Arc<dyn StorageConnector> = match client {
        Some(Ok(client)) => {
            tracing::info!("Initializing storage connector");
            Arc::new(client)
        }
        Some(Err(err)) => {
            tracing::error!("Failed to initialize storage connector: {} - using mock", err);
            Arc::new(mock::MockStorageConnector::default())
        }
        None => {
            tracing::warn!("Storage connector disabled - using mock");
            Arc::new(mock::MockStorageConnector::default())
        }
    };
    web::Data::new(connector)
}
