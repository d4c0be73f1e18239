//! Cover decoding: uploaded image bytes → `DynamicImage`.
//!
//! Decoding happens before any workspace exists, so a broken cover aborts
//! the request without touching the filesystem.

use image::{DynamicImage, ImageError};
use tracing::debug;

/// Decodes an uploaded cover into a bitmap.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, ImageError>;
}

/// Decoder backed by the `image` crate; the format is guessed from the
/// magic bytes (JPEG and PNG are compiled in).
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCoverDecoder;

impl ImageDecoder for ImageCoverDecoder {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, ImageError> {
        let img = image::load_from_memory(data)?;
        debug!(
            width = img.width(),
            height = img.height(),
            bytes = data.len(),
            "Decoded cover image"
        );
        Ok(img)
    }
}
