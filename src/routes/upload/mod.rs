mod file;
mod url;

pub use file::*;
pub use url::*;

use crate::connectors::{OcrConnector, StorageConnector};
use crate::helpers::ApiError;
use crate::models::UploadedFile;
use crate::services::{extraction, Summarizer};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub file_name: String,
    pub file_type: String,
    pub file_url: String,
    pub extracted_text: String,
    pub ai_summary: Option<String>,
}

/// Stores the file and extracts its text concurrently, then summarizes.
/// Only a storage failure fails the upload.
pub(crate) async fn process(
    file: UploadedFile,
    storage: &dyn StorageConnector,
    ocr: &dyn OcrConnector,
    summarizer: &Summarizer,
) -> Result<UploadResponse, ApiError> {
    tracing::info!(
        file_name = %file.file_name,
        content_type = %file.content_type,
        size = file.len(),
        "Processing upload"
    );

    let (stored, extracted_text) = tokio::try_join!(
        async {
            storage.upload(&file).await.map_err(|err| {
                tracing::error!("Upload to storage failed: {}", err);
                ApiError::from(err)
            })
        },
        async { Ok::<_, ApiError>(extraction::extract_text(&file, ocr).await) },
    )?;

    let ai_summary = summarizer.summarize(&extracted_text).await;

    Ok(UploadResponse {
        success: true,
        file_name: file.file_name,
        file_type: file.content_type,
        file_url: stored.url,
        extracted_text,
        ai_summary,
    })
}
