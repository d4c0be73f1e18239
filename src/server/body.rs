//! The attachment response carrying a generated artifact.

use super::error::ApiError;
use crate::config::ARTIFACT_MIME_TYPE;
use crate::convert::Artifact;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::error;

/// RFC 5987 `attr-char`: everything else is percent-encoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// `Content-Disposition` value for a download named `filename`.
///
/// The quoted `filename` is an ASCII-only fallback; names that need it also
/// get a UTF-8 `filename*` parameter.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if fallback == filename {
        format!("attachment; filename=\"{fallback}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            utf8_percent_encode(filename, ATTR_CHAR)
        )
    }
}

/// Stream `artifact` back as an attachment. The workspace is released when
/// the body is dropped.
pub(crate) async fn attachment(artifact: Artifact) -> Result<Response<Body>, ApiError> {
    let filename = artifact.filename().to_string();
    let length = artifact.stats().artifact_bytes;
    let stream = artifact.into_stream().await.map_err(|e| {
        error!(error = %e, filename = %filename, "Failed to open artifact for streaming");
        ApiError::internal()
    })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ARTIFACT_MIME_TYPE)
        .header(header::CONTENT_DISPOSITION, content_disposition(&filename))
        .header(header::CONTENT_LENGTH, length)
        .body(Body::from_stream(stream))
        .map_err(|e| {
            error!(error = %e, filename = %filename, "Failed to build attachment response");
            ApiError::internal()
        })
}
