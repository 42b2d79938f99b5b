use super::process;
use crate::connectors::{OcrConnector, StorageConnector};
use crate::helpers::ApiError;
use crate::models::UploadedFile;
use crate::services::Summarizer;
use actix_multipart::Multipart;
use actix_web::{post, web, Responder, Result};
use futures::TryStreamExt;
use std::sync::Arc;

const FILE_FIELD: &str = "file";

fn invalid_body(err: actix_multipart::MultipartError) -> ApiError {
    ApiError::validation(format!("Invalid multipart body: {}", err))
}

/// Buffers the `file` field; other fields are skipped.
async fn read_file_field(payload: &mut Multipart) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(mut field) = payload.try_next().await.map_err(invalid_body)? {
        if field.content_disposition().get_name() != Some(FILE_FIELD) {
            while field.try_next().await.map_err(invalid_body)?.is_some() {}
            continue;
        }

        let file_name = field
            .content_disposition()
            .get_filename()
            .unwrap_or_default()
            .to_string();
        let content_type = field
            .content_type()
            .map(|mime| mime.to_string())
            .unwrap_or_default();

        let mut bytes = web::BytesMut::new();
        while let Some(chunk) = field.try_next().await.map_err(invalid_body)? {
            bytes.extend_from_slice(&chunk);
        }

        // an empty file input still sends the field
        if file_name.is_empty() && bytes.is_empty() {
            return Ok(None);
        }

        let file_name = if file_name.is_empty() {
            "upload".to_string()
        } else {
            file_name
        };
        return Ok(Some(UploadedFile::new(file_name, content_type, bytes.freeze())));
    }
    Ok(None)
}

/// POST /api/upload (multipart/form-data, field `file`)
#[tracing::instrument(name = "Upload file.", skip_all)]
#[post("/upload")]
pub async fn file_handler(
    mut payload: Multipart,
    storage: web::Data<Arc<dyn StorageConnector>>,
    ocr: web::Data<Arc<dyn OcrConnector>>,
    summarizer: web::Data<Summarizer>,
) -> Result<impl Responder, ApiError> {
    let file = read_file_field(&mut payload)
        .await?
        .ok_or_else(|| ApiError::validation("No file uploaded"))?;

    process(file, storage.as_ref().as_ref(), ocr.as_ref().as_ref(), &summarizer)
        .await
        .map(web::Json)
}
