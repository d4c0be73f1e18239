//! KF8 index records.
//!
//! An index is one header record (`INDX` + `TAGX` tag table + geometry),
//! one data record holding the entries and their `IDXT` offset table, and
//! an optional `CNCX` record with the strings entries point into.
//!
//! Each entry is `[ident length][ident][control byte][values...]` where the
//! values are forward varints. The control byte says how many value groups
//! of each tag the entry carries.

use super::text::FlowFile;
use crate::error::EncodeError;
use std::collections::HashMap;

pub(crate) const INDX_HEADER_LEN: usize = 192;

/// Hard limit of a PalmDB record addressed through 16-bit IDXT offsets.
const RECORD_LIMIT: usize = 0x10000;

/// Longest string stored in a CNCX record.
const CNCX_MAX_STRING: usize = 500;

/// Forward variable-width integer: 7 bits per byte, most significant group
/// first, high bit set on the last byte.
pub(crate) fn encint(mut value: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(5);
    loop {
        out.push((value & 0x7f) as u8);
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    out[0] |= 0x80;
    out.reverse();
    out
}

fn align4(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

// ── Tag tables ───────────────────────────────────────────────────────────────

/// One row of a `TAGX` table.
#[derive(Debug, Clone, Copy)]
struct Tag {
    number: u8,
    values_per_entry: u8,
    mask: u8,
}

impl Tag {
    const fn new(number: u8, values_per_entry: u8, mask: u8) -> Self {
        Self {
            number,
            values_per_entry,
            mask,
        }
    }
}

const SKELETON_TAGS: &[Tag] = &[Tag::new(1, 1, 0x03), Tag::new(6, 2, 0x0c)];

const FRAGMENT_TAGS: &[Tag] = &[
    Tag::new(2, 1, 0x01),
    Tag::new(3, 1, 0x02),
    Tag::new(4, 1, 0x04),
    Tag::new(6, 2, 0x08),
];

const NCX_TAGS: &[Tag] = &[
    Tag::new(1, 1, 0x01),
    Tag::new(2, 1, 0x02),
    Tag::new(3, 1, 0x04),
    Tag::new(4, 1, 0x08),
    Tag::new(6, 2, 0x80),
];

fn control_byte(tags: &[Tag], values: &[Vec<u32>]) -> u8 {
    tags.iter().zip(values).fold(0u8, |acc, (tag, vals)| {
        let groups = (vals.len() / tag.values_per_entry as usize) as u8;
        acc | (tag.mask & (groups << tag.mask.trailing_zeros()))
    })
}

// ── CNCX ─────────────────────────────────────────────────────────────────────

/// String table referenced by index entries through byte offsets.
#[derive(Debug, Default)]
pub(crate) struct Cncx {
    buf: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl Cncx {
    /// Offset of `s` in the table, appending it on first use.
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&offset) = self.offsets.get(s) {
            return offset;
        }
        let mut end = s.len().min(CNCX_MAX_STRING);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        let offset = self.buf.len() as u32;
        self.buf.extend(encint(end as u32));
        self.buf.extend_from_slice(&s.as_bytes()[..end]);
        self.offsets.insert(s.to_string(), offset);
        offset
    }

    fn into_records(mut self, index: &'static str) -> Result<Vec<Vec<u8>>, EncodeError> {
        if self.buf.is_empty() {
            return Ok(Vec::new());
        }
        align4(&mut self.buf);
        if self.buf.len() > RECORD_LIMIT {
            return Err(EncodeError::IndexTooLarge {
                index,
                bytes: self.buf.len(),
            });
        }
        Ok(vec![self.buf])
    }
}

// ── Index ────────────────────────────────────────────────────────────────────

struct Entry {
    ident: String,
    values: Vec<Vec<u32>>,
}

/// An index under construction. Entries must be pushed in ident order.
struct Index {
    name: &'static str,
    tags: &'static [Tag],
    entries: Vec<Entry>,
    cncx: Cncx,
}

impl Index {
    fn new(name: &'static str, tags: &'static [Tag]) -> Self {
        Self {
            name,
            tags,
            entries: Vec::new(),
            cncx: Cncx::default(),
        }
    }

    /// `values` holds one list per tag, in tag order.
    fn push(&mut self, ident: String, values: Vec<Vec<u32>>) {
        debug_assert_eq!(values.len(), self.tags.len());
        self.entries.push(Entry { ident, values });
    }

    fn too_large(&self, bytes: usize) -> EncodeError {
        EncodeError::IndexTooLarge {
            index: self.name,
            bytes,
        }
    }

    fn tagx(&self) -> Vec<u8> {
        let mut out = b"TAGX".to_vec();
        put_u32(&mut out, 12 + 4 * (self.tags.len() as u32 + 1));
        put_u32(&mut out, 1);
        for tag in self.tags {
            out.extend_from_slice(&[tag.number, tag.values_per_entry, tag.mask, 0]);
        }
        out.extend_from_slice(&[0, 0, 0, 1]);
        out
    }

    fn data_record(&self) -> Result<Vec<u8>, EncodeError> {
        let mut block = Vec::new();
        let mut idxt = b"IDXT".to_vec();
        for entry in &self.entries {
            let offset = INDX_HEADER_LEN + block.len();
            let offset = u16::try_from(offset).map_err(|_| self.too_large(offset))?;
            idxt.extend_from_slice(&offset.to_be_bytes());

            block.push(entry.ident.len() as u8);
            block.extend_from_slice(entry.ident.as_bytes());
            block.push(control_byte(self.tags, &entry.values));
            for value in entry.values.iter().flatten() {
                block.extend(encint(*value));
            }
        }
        align4(&mut block);
        align4(&mut idxt);

        let mut rec = b"INDX".to_vec();
        put_u32(&mut rec, INDX_HEADER_LEN as u32);
        put_u32(&mut rec, 0);
        put_u32(&mut rec, 1); // data record
        put_u32(&mut rec, 0);
        put_u32(&mut rec, (INDX_HEADER_LEN + block.len()) as u32);
        put_u32(&mut rec, self.entries.len() as u32);
        rec.extend_from_slice(&[0xff; 8]);
        rec.resize(INDX_HEADER_LEN, 0);
        rec.extend(block);
        rec.extend(idxt);

        if rec.len() > RECORD_LIMIT {
            return Err(self.too_large(rec.len()));
        }
        Ok(rec)
    }

    fn header_record(&self, cncx_records: usize) -> Result<Vec<u8>, EncodeError> {
        let tagx = self.tagx();
        let count = u16::try_from(self.entries.len()).map_err(|_| self.too_large(self.entries.len()))?;

        // Geometry: last ident of the (single) data record and its entry count.
        let last = self.entries.last().map(|e| e.ident.as_bytes()).unwrap_or_default();
        let mut geometry = vec![last.len() as u8];
        geometry.extend_from_slice(last);
        geometry.extend_from_slice(&count.to_be_bytes());
        align4(&mut geometry);

        let mut idxt = b"IDXT".to_vec();
        idxt.extend_from_slice(&((INDX_HEADER_LEN + tagx.len()) as u16).to_be_bytes());
        align4(&mut idxt);

        let mut rec = b"INDX".to_vec();
        put_u32(&mut rec, INDX_HEADER_LEN as u32);
        rec.extend_from_slice(&[0; 8]);
        put_u32(&mut rec, 2);
        put_u32(&mut rec, (INDX_HEADER_LEN + tagx.len() + geometry.len()) as u32);
        put_u32(&mut rec, 1); // data records
        put_u32(&mut rec, 65001);
        put_u32(&mut rec, u32::MAX);
        put_u32(&mut rec, self.entries.len() as u32);
        put_u32(&mut rec, 0); // ORDT
        put_u32(&mut rec, 0); // LIGT
        put_u32(&mut rec, 0);
        put_u32(&mut rec, cncx_records as u32);
        rec.resize(180, 0);
        put_u32(&mut rec, INDX_HEADER_LEN as u32); // TAGX offset
        rec.resize(INDX_HEADER_LEN, 0);
        rec.extend(tagx);
        rec.extend(geometry);
        rec.extend(idxt);
        Ok(rec)
    }

    /// Header record, data record, then CNCX records (if any).
    fn into_records(mut self) -> Result<Vec<Vec<u8>>, EncodeError> {
        let data = self.data_record()?;
        let cncx = std::mem::take(&mut self.cncx).into_records(self.name)?;
        let header = self.header_record(cncx.len())?;

        let mut records = Vec::with_capacity(2 + cncx.len());
        records.push(header);
        records.push(data);
        records.extend(cncx);
        Ok(records)
    }
}

// ── The three KF8 indices ────────────────────────────────────────────────────

/// One entry per file: `SKELnnnnnnnnnn` → fragment count and skeleton span.
/// Both value groups are written twice, as readers expect.
pub(crate) fn skeleton_index(files: &[FlowFile]) -> Result<Vec<Vec<u8>>, EncodeError> {
    let mut index = Index::new("skeleton", SKELETON_TAGS);
    for (i, file) in files.iter().enumerate() {
        let (start, len) = (file.skeleton_start as u32, file.skeleton_len as u32);
        index.push(
            format!("SKEL{i:010}"),
            vec![vec![1, 1], vec![start, len, start, len]],
        );
    }
    index.into_records()
}

/// One entry per fragment, keyed by its insert position.
pub(crate) fn fragment_index(files: &[FlowFile]) -> Result<Vec<Vec<u8>>, EncodeError> {
    let mut index = Index::new("fragment", FRAGMENT_TAGS);
    for (i, file) in files.iter().enumerate() {
        let selector = index.cncx.intern(&format!("P-//*[@aid='{}']", file.aid));
        index.push(
            format!("{:010}", file.insert_pos),
            vec![
                vec![selector],
                vec![i as u32],
                vec![i as u32],
                vec![file.fragment_start as u32, file.fragment_len as u32],
            ],
        );
    }
    index.into_records()
}

/// Table of contents: one top-level entry per chapter.
pub(crate) fn ncx_index(files: &[FlowFile]) -> Result<Vec<Vec<u8>>, EncodeError> {
    let mut index = Index::new("ncx", NCX_TAGS);
    for (i, file) in files.iter().enumerate() {
        let label = index.cncx.intern(&file.title);
        index.push(
            format!("{i:04X}"),
            vec![
                vec![file.skeleton_start as u32],
                vec![(file.skeleton_len + file.fragment_len) as u32],
                vec![label],
                vec![0],
                vec![i as u32, 0],
            ],
        );
    }
    index.into_records()
}
