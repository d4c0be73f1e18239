//! Multipart form → [`ConversionRequest`].
//!
//! Fields:
//! * `markdown` (required, must be a file part with a filename)
//! * `cover` (optional image file)
//! * `title`, `author` (optional text)
//!
//! Fields the client did not send stay `None`. A `markdown` part without a
//! filename is a plain text field, not an upload, and is ignored, so the
//! orchestrator reports the missing input.

use super::error::ApiError;
use crate::error::ConvertError;
use crate::request::{ConversionRequest, Upload};
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use tracing::{debug, warn};

async fn read_bytes(field: Field<'_>) -> Result<Vec<u8>, MultipartError> {
    Ok(field.bytes().await?.to_vec())
}

pub(crate) async fn conversion_request(
    mut multipart: Multipart,
    production: bool,
) -> Result<ConversionRequest, ApiError> {
    let mut request = ConversionRequest::default();
    let stream_error = |e: MultipartError| {
        warn!(error = %e, "Failed to read multipart request");
        ApiError::from_multipart(&e, production)
    };

    while let Some(field) = multipart.next_field().await.map_err(stream_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .file_name()
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        match name.as_str() {
            "markdown" => {
                let Some(filename) = filename else {
                    debug!("Ignoring markdown field that is not a file upload");
                    continue;
                };
                let data = read_bytes(field).await.map_err(|e| {
                    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        warn!(error = %e, filename = %filename, "Markdown upload exceeds size limit");
                        return ApiError::payload_too_large();
                    }
                    warn!(error = %e, filename = %filename, "Failed to read markdown upload");
                    let err = ConvertError::ReadFailure {
                        source: std::io::Error::other(e),
                    };
                    ApiError::from_convert(&err, production)
                })?;
                request.markdown = Some(Upload::new(filename, data));
            }
            "cover" => {
                let data = read_bytes(field).await.map_err(stream_error)?;
                // Browsers send an empty, nameless part when no file was picked.
                if filename.is_none() && data.is_empty() {
                    continue;
                }
                request.cover = Some(Upload::new(filename.unwrap_or_else(|| "cover".into()), data));
            }
            "title" => request.title = Some(field.text().await.map_err(stream_error)?),
            "author" => request.author = Some(field.text().await.map_err(stream_error)?),
            _ => debug!(field = %name, "Ignoring unknown multipart field"),
        }
    }

    debug!(
        markdown = request.markdown.is_some(),
        cover = request.cover.is_some(),
        title = request.title.is_some(),
        author = request.author.is_some(),
        "Parsed multipart request"
    );
    Ok(request)
}
