//! The KF8 text flow and its split into PalmDOC text records.
//!
//! Every chapter becomes one file: a skeleton (the XHTML document with an
//! empty `<body>`) immediately followed by one fragment holding the chapter
//! content. Readers rebuild the file by inserting the fragment at its insert
//! position inside the skeleton.

use crate::book::BookDescription;

/// Uncompressed size of a text record.
pub(crate) const RECORD_SIZE: usize = 4096;

const AID_DIGITS: &[u8; 32] = b"0123456789ABCDEFGHIJKLMNOPQRSTUV";

/// Position of one file inside the raw text flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FlowFile {
    /// `aid` attribute of the skeleton's `<body>`.
    pub aid: String,
    pub title: String,
    pub skeleton_start: usize,
    pub skeleton_len: usize,
    /// Absolute position just after the opening `<body>` tag.
    pub insert_pos: usize,
    /// Offset of the fragment among all fragment bytes of the book.
    pub fragment_start: usize,
    pub fragment_len: usize,
}

#[derive(Debug)]
pub(crate) struct TextFlow {
    pub text: Vec<u8>,
    pub files: Vec<FlowFile>,
}

/// Base-32 element id, as KF8 readers expect in `aid` attributes.
fn aid(mut n: usize) -> String {
    let mut digits = Vec::new();
    loop {
        digits.push(AID_DIGITS[n % 32]);
        n /= 32;
        if n == 0 {
            break;
        }
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn build_flow(book: &BookDescription) -> TextFlow {
    let lang = escape_xml(book.language.tag());
    let mut text = Vec::new();
    let mut files = Vec::with_capacity(book.chapters().len());
    let mut fragment_start = 0;

    for (i, chapter) in book.chapters().iter().enumerate() {
        let aid = aid(i);
        let head = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <html xmlns=\"http://www.w3.org/1999/xhtml\" xml:lang=\"{lang}\">\
             <head><title>{}</title>\
             <meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\"/>\
             </head><body aid=\"{aid}\">",
            escape_xml(&chapter.title)
        );
        let tail = "</body></html>";
        let fragment = format!("<div class=\"chapter\">{}</div>", chapter.content);

        let skeleton_start = text.len();
        text.extend_from_slice(head.as_bytes());
        text.extend_from_slice(tail.as_bytes());
        text.extend_from_slice(fragment.as_bytes());

        files.push(FlowFile {
            aid,
            title: chapter.title.clone(),
            skeleton_start,
            skeleton_len: head.len() + tail.len(),
            insert_pos: skeleton_start + head.len(),
            fragment_start,
            fragment_len: fragment.len(),
        });
        fragment_start += fragment.len();
    }

    TextFlow { text, files }
}

/// Bytes needed after `chunk` to complete its last UTF-8 character.
fn overlap_len(chunk: &[u8]) -> usize {
    for back in 1..=chunk.len().min(4) {
        let b = chunk[chunk.len() - back];
        if b & 0xc0 != 0x80 {
            let width: usize = match b {
                0x00..=0x7f => 1,
                _ if b >> 5 == 0b110 => 2,
                _ if b >> 4 == 0b1110 => 3,
                _ if b >> 3 == 0b11110 => 4,
                _ => 1,
            };
            return width.saturating_sub(back);
        }
    }
    0
}

/// Split the flow into fixed-size records. Each record carries a multibyte
/// trailing entry: the continuation bytes of a character cut at the record
/// boundary, then their count.
pub(crate) fn split_records(text: &[u8]) -> Vec<Vec<u8>> {
    let mut records = Vec::with_capacity(text.len() / RECORD_SIZE + 1);
    let mut start = 0;
    while start < text.len() {
        let end = (start + RECORD_SIZE).min(text.len());
        let overlap = overlap_len(&text[start..end]).min(text.len() - end);

        let mut rec = Vec::with_capacity(end - start + overlap + 1);
        rec.extend_from_slice(&text[start..end]);
        rec.extend_from_slice(&text[end..end + overlap]);
        rec.push(overlap as u8);
        records.push(rec);
        start = end;
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Chapter;

    fn strip_trailing(rec: &[u8]) -> &[u8] {
        let n = (rec[rec.len() - 1] & 0x3) as usize + 1;
        &rec[..rec.len() - n]
    }

    #[test]
    fn aid_is_base32() {
        assert_eq!(aid(0), "0");
        assert_eq!(aid(31), "V");
        assert_eq!(aid(32), "10");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }

    #[test]
    fn flow_inserts_fragment_after_body() {
        let book = BookDescription::new("T & U", 1, Chapter::new("T & U", "<p>hi</p>"));
        let flow = build_flow(&book);
        let file = &flow.files[0];

        let skeleton = &flow.text[file.skeleton_start..file.skeleton_start + file.skeleton_len];
        let offset = file.insert_pos - file.skeleton_start;
        let fragment = &flow.text[file.skeleton_start + file.skeleton_len..][..file.fragment_len];
        let mut rebuilt = skeleton[..offset].to_vec();
        rebuilt.extend_from_slice(fragment);
        rebuilt.extend_from_slice(&skeleton[offset..]);

        let rebuilt = String::from_utf8(rebuilt).unwrap();
        assert!(rebuilt.contains("<title>T &amp; U</title>"));
        assert!(rebuilt.contains("<body aid=\"0\"><div class=\"chapter\"><p>hi</p></div></body></html>"));
        assert_eq!(flow.text.len(), file.skeleton_len + file.fragment_len);
    }

    #[test]
    fn multiple_chapters_are_contiguous() {
        let mut book = BookDescription::new("B", 1, Chapter::new("One", "<p>1</p>"));
        book.push_chapter(Chapter::new("Two", "<p>22</p>"));
        let flow = build_flow(&book);
        let (a, b) = (&flow.files[0], &flow.files[1]);
        assert_eq!(b.skeleton_start, a.skeleton_start + a.skeleton_len + a.fragment_len);
        assert_eq!(b.fragment_start, a.fragment_len);
        assert_eq!(b.aid, "1");
    }

    #[test]
    fn records_reassemble_to_text() {
        let text = "é".repeat(5000).into_bytes();
        let records = split_records(&text);
        assert_eq!(records.len(), 3);
        let joined: Vec<u8> = records.iter().flat_map(|r| strip_trailing(r).to_vec()).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn split_character_is_completed_in_trailing_entry() {
        // 4095 ASCII bytes then a two-byte character straddling the boundary.
        let mut text = vec![b'a'; 4095];
        text.extend_from_slice("é".as_bytes());
        let records = split_records(&text);
        assert_eq!(records[0].len(), 4096 + 1 + 1);
        assert_eq!(records[0][4096], 0xa9);
        assert_eq!(*records[0].last().unwrap(), 1);
        assert_eq!(records[1], vec![0xa9, 0]);
    }

    #[test]
    fn ascii_records_have_empty_trailing_entry() {
        let records = split_records(b"hello");
        assert_eq!(records, vec![b"hello\0".to_vec()]);
    }
}
