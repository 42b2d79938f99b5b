use reqwest::Url;
use serde::Deserialize;
use serde_valid::Validate;

/// JSON variant of the upload endpoint: fetch the file from `url`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UploadFromUrl {
    #[serde(default)]
    #[validate(min_length = 1)]
    #[validate(max_length = 2048)]
    pub url: String,
}

impl UploadFromUrl {
    /// Only absolute http(s) URLs are fetched.
    pub fn parsed_url(&self) -> Result<Url, String> {
        let url = Url::parse(self.url.trim()).map_err(|err| format!("Invalid url: {}", err))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(format!("Unsupported url scheme: {}", scheme)),
        }
    }
}
