//! PalmDB: the record database every MOBI-family file is stored in.

use std::io::{self, Write};

pub(crate) const HEADER_LEN: usize = 78;
const ENTRY_LEN: usize = 8;
const GAP_LEN: usize = 2;
const NAME_LEN: usize = 32;

/// Database name derived from a title: ASCII alphanumerics kept, anything
/// else replaced by `_`, at most 31 bytes so the field stays NUL-terminated.
pub(crate) fn database_name(title: &str) -> String {
    let name: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(NAME_LEN - 1)
        .collect();
    if name.is_empty() {
        "book".to_string()
    } else {
        name
    }
}

/// Write the header, the record list and every record.
pub(crate) fn write_database<W: Write + ?Sized>(
    w: &mut W,
    name: &str,
    timestamp: u32,
    records: &[Vec<u8>],
) -> io::Result<()> {
    let count = u16::try_from(records.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many PalmDB records"))?;

    let mut header = Vec::with_capacity(HEADER_LEN + records.len() * ENTRY_LEN + GAP_LEN);
    let mut raw_name = [0u8; NAME_LEN];
    let n = name.len().min(NAME_LEN - 1);
    raw_name[..n].copy_from_slice(&name.as_bytes()[..n]);
    header.extend_from_slice(&raw_name);
    header.extend_from_slice(&[0; 4]); // attributes, version
    header.extend_from_slice(&timestamp.to_be_bytes()); // created
    header.extend_from_slice(&timestamp.to_be_bytes()); // modified
    header.extend_from_slice(&[0; 16]); // backup, modnum, appinfo, sortinfo
    header.extend_from_slice(b"BOOKMOBI");
    header.extend_from_slice(&(2 * u32::from(count)).saturating_sub(1).to_be_bytes());
    header.extend_from_slice(&[0; 4]); // next record list
    header.extend_from_slice(&count.to_be_bytes());

    let mut offset = HEADER_LEN + records.len() * ENTRY_LEN + GAP_LEN;
    for (i, rec) in records.iter().enumerate() {
        let at = u32::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "PalmDB exceeds 4 GiB"))?;
        header.extend_from_slice(&at.to_be_bytes());
        header.push(0);
        header.extend_from_slice(&(2 * i as u32).to_be_bytes()[1..]);
        offset += rec.len();
    }
    header.extend_from_slice(&[0; GAP_LEN]);

    w.write_all(&header)?;
    for rec in records {
        w.write_all(rec)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_sanitised_and_bounded() {
        assert_eq!(database_name("My Notes!"), "My_Notes_");
        assert_eq!(database_name(""), "book");
        assert_eq!(database_name(&"x".repeat(80)).len(), 31);
        assert_eq!(database_name("Ünï"), "_n_");
    }

    #[test]
    fn header_and_record_list() {
        let records = vec![b"abcd".to_vec(), b"ef".to_vec()];
        let mut out = Vec::new();
        write_database(&mut out, "Notes", 1_700_000_000, &records).unwrap();

        assert_eq!(&out[..5], b"Notes");
        assert_eq!(out[5], 0);
        assert_eq!(&out[60..68], b"BOOKMOBI");
        assert_eq!(u32::from_be_bytes(out[68..72].try_into().unwrap()), 3);
        assert_eq!(u16::from_be_bytes([out[76], out[77]]), 2);

        let first = u32::from_be_bytes(out[78..82].try_into().unwrap()) as usize;
        let second = u32::from_be_bytes(out[86..90].try_into().unwrap()) as usize;
        assert_eq!(first, 78 + 16 + 2);
        assert_eq!(&out[91..94], &[0, 0, 2], "uid of the second record");
        assert_eq!(&out[first..first + 4], b"abcd");
        assert_eq!(&out[second..], b"ef");
    }
}
