//! Inbound request types.
//!
//! A [`ConversionRequest`] is built by a transport (the multipart extractor in
//! [`crate::server`] or the `convert` CLI subcommand) and consumed by exactly
//! one call to [`crate::convert::Converter::convert`].

use crate::error::ConvertError;
use std::fmt;
use std::path::Path;

/// An uploaded file: its original client-side name and its bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Upload {
    /// Filename exactly as the client sent it.
    pub filename: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Read a local markdown file into an upload named after the file.
    pub fn markdown_from_path(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| ConvertError::ReadFailure { source })?;
        Ok(Self::new(display_name(path), data))
    }

    /// Read a local cover image. Read errors count as undecodable covers.
    pub fn cover_from_path(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| ConvertError::CoverDecodeFailure {
            source: image::ImageError::IoError(e),
        })?;
        Ok(Self::new(display_name(path), data))
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("filename", &self.filename)
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// One conversion request. Optional fields are `None` when the client
/// omitted them, never `Some("")` placeholders.
#[derive(Debug, Clone, Default)]
pub struct ConversionRequest {
    pub markdown: Option<Upload>,
    pub cover: Option<Upload>,
    pub title: Option<String>,
    pub author: Option<String>,
}

impl ConversionRequest {
    pub fn new(markdown: Upload) -> Self {
        Self {
            markdown: Some(markdown),
            ..Self::default()
        }
    }

    pub fn with_cover(mut self, cover: Upload) -> Self {
        self.cover = Some(cover);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Per-request fields attached to every log line of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// A context with a freshly generated UUID v4 request id.
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}
