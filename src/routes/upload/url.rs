use super::process;
use crate::connectors::{OcrConnector, StorageConnector};
use crate::forms;
use crate::helpers::ApiError;
use crate::services::{remote, Summarizer};
use actix_web::guard::GuardContext;
use actix_web::http::header;
use actix_web::{post, web, Responder, Result};
use serde_valid::Validate;
use std::sync::Arc;

fn is_json(ctx: &GuardContext) -> bool {
    ctx.head()
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start().to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false)
}

/// POST /api/upload (application/json `{url}`)
/// Fetches the file behind `url`, then handles it like a multipart upload.
#[tracing::instrument(name = "Upload from url.", skip_all)]
#[post("/upload", guard = "is_json")]
pub async fn url_handler(
    web::Json(form): web::Json<forms::UploadFromUrl>,
    http_client: web::Data<reqwest::Client>,
    storage: web::Data<Arc<dyn StorageConnector>>,
    ocr: web::Data<Arc<dyn OcrConnector>>,
    summarizer: web::Data<Summarizer>,
) -> Result<impl Responder, ApiError> {
    if form.validate().is_err() {
        return Err(ApiError::validation("No file or url provided"));
    }
    let url = form.parsed_url().map_err(ApiError::Validation)?;

    let file = remote::fetch_file(&http_client, &url).await.map_err(|err| {
        tracing::error!("Fetching {} failed: {}", url, err);
        ApiError::from(err)
    })?;

    process(file, storage.as_ref().as_ref(), ocr.as_ref().as_ref(), &summarizer)
        .await
        .map(web::Json)
}
