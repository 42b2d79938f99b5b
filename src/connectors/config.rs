use serde::{Deserialize, Serialize};

/// Configuration for external service connectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub llm: Option<LlmConfig>,
    pub summarizer: Option<LlmConfig>,
    pub storage: Option<StorageConfig>,
    pub ocr: Option<OcrConfig>,
}

impl ConnectorConfig {
    /// Pull API keys and secrets from the environment.
    /// Values already present (e.g. set by tests) are kept.
    pub fn load_secrets_from_env(&mut self) {
        let gemini_key = std::env::var("GEMINI_API_KEY").ok();

        if let Some(llm) = self.llm.as_mut() {
            if llm.api_key.is_none() {
                llm.api_key = gemini_key.clone();
            }
        }
        if let Some(summarizer) = self.summarizer.as_mut() {
            if summarizer.api_key.is_none() {
                summarizer.api_key = std::env::var("SUMMARIZER_API_KEY").ok().or(gemini_key);
            }
        }
        if let Some(storage) = self.storage.as_mut() {
            if storage.cloud_name.is_none() {
                storage.cloud_name = std::env::var("CLOUDINARY_CLOUD_NAME").ok();
            }
            if storage.api_key.is_none() {
                storage.api_key = std::env::var("CLOUDINARY_API_KEY").ok();
            }
            if storage.api_secret.is_none() {
                storage.api_secret = std::env::var("CLOUDINARY_API_SECRET").ok();
            }
        }
        if let Some(ocr) = self.ocr.as_mut() {
            if ocr.api_key.is_none() {
                ocr.api_key = std::env::var("OCR_API_KEY").ok();
            }
        }
    }
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            llm: Some(LlmConfig::default()),
            summarizer: Some(LlmConfig {
                model: "gemini-1.5-flash-latest".to_string(),
                ..LlmConfig::default()
            }),
            storage: Some(StorageConfig::default()),
            ocr: Some(OcrConfig::default()),
        }
    }
}

/// Generative text API (Gemini `generateContent`) configuration.
/// Used for both the chat model and the upload summarizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Enable/disable the connector; disabled falls back to the mock
    pub enabled: bool,
    /// API base URL, without the `/models/...` suffix
    pub base_url: String,
    /// Model name, e.g. gemini-1.5-flash
    pub model: String,
    /// HTTP request timeout in seconds (0 = no timeout)
    #[serde(default)]
    pub timeout_secs: u64,
    /// API key (from env: GEMINI_API_KEY / SUMMARIZER_API_KEY)
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout_secs: 60,
            api_key: None,
        }
    }
}

/// Object storage (Cloudinary upload API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Destination folder for uploaded files
    #[serde(default = "StorageConfig::default_folder")]
    pub folder: String,
    #[serde(default)]
    pub timeout_secs: u64,
    #[serde(skip)]
    pub cloud_name: Option<String>,
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(skip)]
    pub api_secret: Option<String>,
}

impl StorageConfig {
    fn default_folder() -> String {
        "uploads".to_string()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.cloudinary.com".to_string(),
            folder: Self::default_folder(),
            timeout_secs: 60,
            cloud_name: None,
            api_key: None,
            api_secret: None,
        }
    }
}

/// OCR service (OCR.space compatible) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Recognition language, three-letter code
    #[serde(default = "OcrConfig::default_language")]
    pub language: String,
    #[serde(default)]
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl OcrConfig {
    fn default_language() -> String {
        "eng".to_string()
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.ocr.space".to_string(),
            language: Self::default_language(),
            timeout_secs: 60,
            api_key: None,
        }
    }
}

/// Builds a reqwest client honouring `timeout_secs` (0 = none).
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder();
    if timeout_secs > 0 {
        builder = builder.timeout(std::time::Duration::from_secs(timeout_secs));
    }
    builder.build()
}
