use crate::connectors::errors::error_for_response;
use crate::connectors::ConnectorError;
use crate::models::UploadedFile;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use tracing::Instrument;

const DEFAULT_FILE_NAME: &str = "download";

/// Last path segment of `url`, percent-decoded.
pub(crate) fn file_name_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|name| name.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}

/// Downloads `url` into memory.
pub async fn fetch_file(client: &reqwest::Client, url: &Url) -> Result<UploadedFile, ConnectorError> {
    let span = tracing::info_span!("fetch_remote_file", url = %url);
    let resp = client
        .get(url.clone())
        .send()
        .instrument(span.clone())
        .await
        .map_err(|err| {
            tracing::error!(parent: &span, "remote file fetch failed: {:?}", err);
            ConnectorError::from(err)
        })?;

    if !resp.status().is_success() {
        return Err(error_for_response("Remote file", resp).await);
    }

    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = resp.bytes().await?;

    Ok(UploadedFile::new(
        file_name_from_url(url),
        content_type,
        bytes,
    ))
}
