//! Error types for the md2azw3 library.
//!
//! Two error types reflect the two layers of the conversion:
//!
//! * [`ConvertError`] is returned by the orchestrator. Every variant is
//!   terminal for its request and carries the underlying cause as its
//!   `source`, so a single `error = %e` log field shows the whole chain.
//!   [`ConvertError::kind`] reduces it to an [`ErrorKind`], the stable
//!   classification the transport layer turns into a status code and a
//!   client-facing message.
//!
//! * [`EncodeError`] is returned by the AZW3 container writer. The orchestrator
//!   wraps it in [`ConvertError::EncodeFailure`].

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Stable classification of a failed conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingInput,
    ReadFailure,
    RenderFailure,
    CoverDecodeFailure,
    ResourceFailure,
    EncodeFailure,
}

impl ErrorKind {
    /// HTTP status code the transport layer answers with.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::MissingInput => 400,
            ErrorKind::ReadFailure
            | ErrorKind::RenderFailure
            | ErrorKind::CoverDecodeFailure
            | ErrorKind::ResourceFailure
            | ErrorKind::EncodeFailure => 500,
        }
    }

    /// Message safe to show to the client. Never includes error details.
    pub fn client_message(self) -> &'static str {
        match self {
            ErrorKind::MissingInput => "markdown file is required",
            ErrorKind::ReadFailure => "failed to read markdown file",
            ErrorKind::RenderFailure => "failed to render markdown",
            ErrorKind::CoverDecodeFailure => "failed to process cover image",
            ErrorKind::ResourceFailure => "internal server error",
            ErrorKind::EncodeFailure => "failed to generate azw3",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MissingInput => "missing_input",
            ErrorKind::ReadFailure => "read_failure",
            ErrorKind::RenderFailure => "render_failure",
            ErrorKind::CoverDecodeFailure => "cover_decode_failure",
            ErrorKind::ResourceFailure => "resource_failure",
            ErrorKind::EncodeFailure => "encode_failure",
        }
    }
}

/// All errors returned by [`crate::convert::Converter`].
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The request carried no markdown file upload.
    #[error("markdown file is required")]
    MissingInput,

    /// The uploaded markdown payload could not be read.
    #[error("failed to read markdown payload: {source}")]
    ReadFailure {
        #[source]
        source: std::io::Error,
    },

    /// The content renderer rejected the markdown.
    #[error("failed to render markdown: {detail}")]
    RenderFailure { detail: String },

    /// A cover was supplied but is not a decodable image.
    #[error("failed to decode cover image: {source}")]
    CoverDecodeFailure {
        #[source]
        source: image::ImageError,
    },

    /// The workspace directory or the output file could not be created, or
    /// the artifact could not be copied to its destination.
    #[error("failed to create {what} '{path}': {source}")]
    ResourceFailure {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The container encoder failed while serialising the book.
    #[error("failed to encode azw3 '{path}': {source}")]
    EncodeFailure {
        path: PathBuf,
        #[source]
        source: EncodeError,
    },

    /// The blocking conversion task was cancelled or panicked before it
    /// produced a result.
    #[error("conversion task did not complete: {source}")]
    Interrupted {
        #[source]
        source: tokio::task::JoinError,
    },
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::MissingInput => ErrorKind::MissingInput,
            ConvertError::ReadFailure { .. } => ErrorKind::ReadFailure,
            ConvertError::RenderFailure { .. } => ErrorKind::RenderFailure,
            ConvertError::CoverDecodeFailure { .. } => ErrorKind::CoverDecodeFailure,
            ConvertError::ResourceFailure { .. } => ErrorKind::ResourceFailure,
            ConvertError::EncodeFailure { .. } => ErrorKind::EncodeFailure,
            ConvertError::Interrupted { .. } => ErrorKind::ResourceFailure,
        }
    }
}

/// Errors raised while realising or writing an AZW3 container.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Writing to the byte sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cover or thumbnail could not be re-encoded as JPEG.
    #[error("cover re-encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// The text flow needs more records than a PalmDB can address.
    #[error("text of {bytes} bytes exceeds the {max} byte container limit")]
    TextTooLarge { bytes: usize, max: usize },

    /// An index grew past the 64 KiB a single INDX record can hold.
    #[error("{index} index does not fit in a single record ({bytes} bytes)")]
    IndexTooLarge { index: &'static str, bytes: usize },

    /// A book without chapters reached the encoder.
    #[error("book has no chapters")]
    NoChapters,
}

/// Invalid configuration values.
#[derive(Debug, Error)]
#[error("Invalid configuration: {0}")]
pub struct ConfigError(pub String);
