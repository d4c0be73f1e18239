//! Container encoding: `BookDescription` → AZW3 bytes on a writer.
//!
//! The encoder never touches the filesystem itself. The orchestrator hands it
//! the open output file, so an encoder failure leaves at most a partial file
//! inside the request workspace, which is removed with it.

use crate::azw3::{self, RealizeOptions};
use crate::book::BookDescription;
use crate::config::ConversionConfig;
use crate::error::EncodeError;
use std::io::Write;
use tracing::debug;

/// Serialises a book description into an e-book container.
pub trait ArtifactEncoder: Send + Sync {
    fn encode(&self, book: &BookDescription, out: &mut dyn Write) -> Result<(), EncodeError>;
}

/// KF8 (AZW3) encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Azw3Encoder {
    options: RealizeOptions,
}

impl Azw3Encoder {
    pub fn new(options: RealizeOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(RealizeOptions {
            jpeg_quality: config.cover_jpeg_quality,
            thumbnail_height: config.thumbnail_height,
        })
    }
}

impl ArtifactEncoder for Azw3Encoder {
    fn encode(&self, book: &BookDescription, out: &mut dyn Write) -> Result<(), EncodeError> {
        let container = azw3::realize(book, &self.options)?;
        container.write_to(out)?;
        out.flush()?;
        debug!(bytes = container.byte_len(), "Wrote AZW3 container");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Chapter;
    use std::io;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn book() -> BookDescription {
        BookDescription::new("Notes", 7, Chapter::new("Notes", "<p>hello</p>"))
    }

    #[test]
    fn encodes_into_buffer() {
        let mut out = Vec::new();
        Azw3Encoder::default().encode(&book(), &mut out).unwrap();
        assert_eq!(&out[60..68], b"BOOKMOBI");
    }

    #[test]
    fn write_failure_is_io_error() {
        let err = Azw3Encoder::default()
            .encode(&book(), &mut FailingWriter)
            .unwrap_err();
        assert!(matches!(err, EncodeError::Io(_)), "got {err:?}");
    }

    #[test]
    fn config_drives_cover_options() {
        let config = ConversionConfig::builder()
            .cover_jpeg_quality(55)
            .thumbnail_height(100)
            .build()
            .unwrap();
        let enc = Azw3Encoder::from_config(&config);
        assert_eq!(enc.options.jpeg_quality, 55);
        assert_eq!(enc.options.thumbnail_height, 100);
    }
}
