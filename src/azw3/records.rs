//! Fixed-format trailer records and image resources.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError};

const FLIS: &[u8] = b"FLIS\0\0\0\x08\0\x41\0\0\0\0\0\0\xff\xff\xff\xff\0\x01\0\x03\0\0\0\x03\0\0\0\x01\xff\xff\xff\xff";
const EOF: &[u8] = b"\xe9\x8e\r\n";

/// Flow division table. The whole text is a single flow.
pub(crate) fn fdst(text_length: u32) -> Vec<u8> {
    let mut rec = b"FDST".to_vec();
    rec.extend_from_slice(&12u32.to_be_bytes());
    rec.extend_from_slice(&1u32.to_be_bytes());
    rec.extend_from_slice(&0u32.to_be_bytes());
    rec.extend_from_slice(&text_length.to_be_bytes());
    rec
}

pub(crate) fn flis() -> Vec<u8> {
    FLIS.to_vec()
}

pub(crate) fn fcis(text_length: u32) -> Vec<u8> {
    let mut rec = b"FCIS\0\0\0\x14\0\0\0\x10\0\0\0\x02\0\0\0\0".to_vec();
    rec.extend_from_slice(&text_length.to_be_bytes());
    rec.extend_from_slice(b"\0\0\0\0\0\0\0\x28\0\0\0\0\0\0\0\x28\0\0\0\x08\0\x01\0\x01\0\0\0\0");
    rec
}

pub(crate) fn eof() -> Vec<u8> {
    EOF.to_vec()
}

fn jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
    Ok(buf)
}

/// Cover and thumbnail records, both JPEG. The thumbnail is scaled down to
/// `thumbnail_height` when the cover is taller.
pub(crate) fn cover_records(
    cover: &DynamicImage,
    quality: u8,
    thumbnail_height: u32,
) -> Result<Vec<Vec<u8>>, ImageError> {
    let full = jpeg(cover, quality)?;
    let thumb = if cover.height() > thumbnail_height {
        jpeg(&cover.thumbnail(u32::MAX, thumbnail_height), quality)?
    } else {
        full.clone()
    };
    Ok(vec![full, thumb])
}
