//! Record 0: PalmDOC header, MOBI header (KF8 layout), EXTH metadata and the
//! full title.

use crate::book::BookDescription;
use chrono::SecondsFormat;

pub(crate) const PALMDOC_HEADER_LEN: usize = 16;
pub(crate) const MOBI_HEADER_LEN: usize = 264;

const NULL_INDEX: u32 = u32::MAX;

// EXTH record types.
const EXTH_AUTHOR: u32 = 100;
const EXTH_PUBLISHING_DATE: u32 = 106;
const EXTH_RESOURCE_COUNT: u32 = 125;
const EXTH_COVER_OFFSET: u32 = 201;
const EXTH_THUMB_OFFSET: u32 = 202;
const EXTH_FAKE_COVER: u32 = 203;
const EXTH_CDE_TYPE: u32 = 501;
const EXTH_UPDATED_TITLE: u32 = 503;
const EXTH_LANGUAGE: u32 = 524;

/// Record numbers and sizes record 0 points at.
#[derive(Debug, Clone, Default)]
pub(crate) struct Layout {
    pub text_length: u32,
    pub text_records: u16,
    pub first_non_text: u32,
    /// First image record; `None` when the book has no resources.
    pub first_resource: Option<u32>,
    pub resource_count: u32,
    pub skeleton_index: u32,
    pub fragment_index: u32,
    pub ncx_index: u32,
    pub fdst: u32,
    pub flis: u32,
    pub fcis: u32,
}

fn set_u32(buf: &mut [u8], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_be_bytes());
}

fn set_u16(buf: &mut [u8], at: usize, v: u16) {
    buf[at..at + 2].copy_from_slice(&v.to_be_bytes());
}

fn palmdoc_header(layout: &Layout) -> [u8; PALMDOC_HEADER_LEN] {
    let mut h = [0u8; PALMDOC_HEADER_LEN];
    set_u16(&mut h, 0, 1); // no compression
    set_u32(&mut h, 4, layout.text_length);
    set_u16(&mut h, 8, layout.text_records);
    set_u16(&mut h, 10, super::text::RECORD_SIZE as u16);
    h
}

fn mobi_header(book: &BookDescription, layout: &Layout, title_offset: u32, title_len: u32) -> Vec<u8> {
    let mut h = vec![0u8; MOBI_HEADER_LEN];
    h[..4].copy_from_slice(b"MOBI");
    set_u32(&mut h, 4, MOBI_HEADER_LEN as u32);
    set_u32(&mut h, 8, 2); // book
    set_u32(&mut h, 12, 65001);
    set_u32(&mut h, 16, book.unique_id);
    set_u32(&mut h, 20, 8);
    h[24..64].fill(0xff); // orthographic, inflection and extra indices

    set_u32(&mut h, 64, layout.first_non_text);
    set_u32(&mut h, 68, title_offset);
    set_u32(&mut h, 72, title_len);
    set_u32(&mut h, 76, book.language.lcid());
    set_u32(&mut h, 88, 8); // minimum reader version
    set_u32(&mut h, 92, layout.first_resource.unwrap_or(NULL_INDEX));
    set_u32(&mut h, 112, 0x50); // EXTH present
    set_u32(&mut h, 148, NULL_INDEX);
    set_u32(&mut h, 152, NULL_INDEX); // no DRM

    set_u32(&mut h, 176, layout.fdst);
    set_u32(&mut h, 180, 1);
    set_u32(&mut h, 184, layout.fcis);
    set_u32(&mut h, 188, 1);
    set_u32(&mut h, 192, layout.flis);
    set_u32(&mut h, 196, 1);
    set_u32(&mut h, 208, NULL_INDEX); // SRCS
    h[216..224].fill(0xff);
    set_u32(&mut h, 224, 1); // multibyte trailing entries
    set_u32(&mut h, 228, layout.ncx_index);
    set_u32(&mut h, 232, layout.fragment_index);
    set_u32(&mut h, 236, layout.skeleton_index);
    set_u32(&mut h, 240, NULL_INDEX); // DATP
    set_u32(&mut h, 244, NULL_INDEX); // guide
    set_u32(&mut h, 248, NULL_INDEX);
    set_u32(&mut h, 256, NULL_INDEX);
    h
}

fn exth(book: &BookDescription, layout: &Layout) -> Vec<u8> {
    let mut records: Vec<(u32, Vec<u8>)> = Vec::new();
    for author in &book.authors {
        records.push((EXTH_AUTHOR, author.as_bytes().to_vec()));
    }
    let date = book.created_at.to_rfc3339_opts(SecondsFormat::Secs, false);
    records.push((EXTH_PUBLISHING_DATE, date.into_bytes()));
    if layout.first_resource.is_some() {
        records.push((EXTH_RESOURCE_COUNT, layout.resource_count.to_be_bytes().to_vec()));
    }
    if book.cover.is_some() {
        // Offsets are relative to the first resource record.
        records.push((EXTH_COVER_OFFSET, 0u32.to_be_bytes().to_vec()));
        records.push((EXTH_THUMB_OFFSET, 1u32.to_be_bytes().to_vec()));
        records.push((EXTH_FAKE_COVER, 0u32.to_be_bytes().to_vec()));
    }
    records.push((EXTH_CDE_TYPE, b"EBOK".to_vec()));
    records.push((EXTH_UPDATED_TITLE, book.title.as_bytes().to_vec()));
    records.push((EXTH_LANGUAGE, book.language.tag().as_bytes().to_vec()));

    let mut body = Vec::new();
    for (kind, data) in &records {
        body.extend_from_slice(&kind.to_be_bytes());
        body.extend_from_slice(&(data.len() as u32 + 8).to_be_bytes());
        body.extend_from_slice(data);
    }

    let mut out = b"EXTH".to_vec();
    out.extend_from_slice(&(body.len() as u32 + 12).to_be_bytes());
    out.extend_from_slice(&(records.len() as u32).to_be_bytes());
    out.extend(body);
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}

/// Assemble record 0.
pub(crate) fn record0(book: &BookDescription, layout: &Layout) -> Vec<u8> {
    let exth = exth(book, layout);
    let title = book.title.as_bytes();
    let title_offset = (PALMDOC_HEADER_LEN + MOBI_HEADER_LEN + exth.len()) as u32;

    let mut rec = Vec::with_capacity(title_offset as usize + title.len() + 4);
    rec.extend_from_slice(&palmdoc_header(layout));
    rec.extend(mobi_header(book, layout, title_offset, title.len() as u32));
    rec.extend(exth);
    rec.extend_from_slice(title);
    // At least two NUL bytes after the title, then 4-byte alignment.
    rec.extend_from_slice(&[0, 0]);
    while rec.len() % 4 != 0 {
        rec.push(0);
    }
    rec
}
