//! AZW3 (KF8) container writer.
//!
//! Writing is two-phase: [`realize`] lays the book out as a list of PalmDB
//! records, then [`Container::write_to`] serialises them to any byte sink.
//!
//! Record order:
//!
//! ```text
//! 0            record 0 (PalmDOC + MOBI + EXTH + title)
//! 1..=n        text records
//! n+1..        cover and thumbnail (when a cover is set)
//!              skeleton index, fragment index (+CNCX), NCX index (+CNCX)
//!              FDST, FLIS, FCIS, EOF
//! ```
//!
//! Text is stored uncompressed. Only KF8 output is produced; there is no
//! legacy MOBI 6 section.

mod header;
mod index;
mod palmdb;
mod records;
mod text;

use crate::book::BookDescription;
use crate::error::EncodeError;
use std::io::{self, Write};
use tracing::debug;

/// Most text records a single book may span.
const MAX_TEXT_RECORDS: usize = 0xff00;

/// Largest text flow, in bytes, a container can hold.
pub const MAX_TEXT_BYTES: usize = MAX_TEXT_RECORDS * text::RECORD_SIZE;

/// Cover embedding parameters.
#[derive(Debug, Clone, Copy)]
pub struct RealizeOptions {
    pub jpeg_quality: u8,
    pub thumbnail_height: u32,
}

impl Default for RealizeOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            thumbnail_height: 330,
        }
    }
}

/// A fully laid-out AZW3 file.
#[derive(Debug)]
pub struct Container {
    name: String,
    timestamp: u32,
    records: Vec<Vec<u8>>,
}

impl Container {
    pub fn records(&self) -> &[Vec<u8>] {
        &self.records
    }

    /// Size of the serialised file in bytes.
    pub fn byte_len(&self) -> usize {
        palmdb::HEADER_LEN
            + self.records.len() * 8
            + 2
            + self.records.iter().map(Vec::len).sum::<usize>()
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        palmdb::write_database(w, &self.name, self.timestamp, &self.records)
    }
}

/// Lay out `book` as AZW3 records.
pub fn realize(book: &BookDescription, options: &RealizeOptions) -> Result<Container, EncodeError> {
    if book.chapters().is_empty() {
        return Err(EncodeError::NoChapters);
    }

    let flow = text::build_flow(book);
    if flow.text.len() > MAX_TEXT_BYTES {
        return Err(EncodeError::TextTooLarge {
            bytes: flow.text.len(),
            max: MAX_TEXT_BYTES,
        });
    }
    let text_length = flow.text.len() as u32;

    let mut recs: Vec<Vec<u8>> = vec![Vec::new()];
    recs.extend(text::split_records(&flow.text));
    let text_records = (recs.len() - 1) as u16;

    let mut layout = header::Layout {
        text_length,
        text_records,
        first_non_text: recs.len() as u32,
        ..Default::default()
    };

    if let Some(cover) = &book.cover {
        let images = records::cover_records(cover, options.jpeg_quality, options.thumbnail_height)?;
        layout.first_resource = Some(recs.len() as u32);
        layout.resource_count = images.len() as u32;
        recs.extend(images);
    }

    layout.skeleton_index = recs.len() as u32;
    recs.extend(index::skeleton_index(&flow.files)?);
    layout.fragment_index = recs.len() as u32;
    recs.extend(index::fragment_index(&flow.files)?);
    layout.ncx_index = recs.len() as u32;
    recs.extend(index::ncx_index(&flow.files)?);

    layout.fdst = recs.len() as u32;
    recs.push(records::fdst(text_length));
    layout.flis = recs.len() as u32;
    recs.push(records::flis());
    layout.fcis = recs.len() as u32;
    recs.push(records::fcis(text_length));
    recs.push(records::eof());

    recs[0] = header::record0(book, &layout);

    debug!(
        records = recs.len(),
        text_bytes = text_length,
        text_records,
        cover = book.cover.is_some(),
        "Realized AZW3 container"
    );

    Ok(Container {
        name: palmdb::database_name(&book.title),
        timestamp: book.created_at.timestamp().clamp(0, i64::from(u32::MAX)) as u32,
        records: recs,
    })
}
