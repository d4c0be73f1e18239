//! Markdown rendering: raw markdown bytes → XHTML chapter content.
//!
//! The renderer is total over its input: invalid UTF-8 is decoded lossily
//! and every CommonMark document has an HTML rendering. The trait still
//! returns `Result` so alternative renderers can reject input, which the
//! orchestrator classifies as a render failure.

use once_cell::sync::Lazy;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// A renderer rejected its input.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

/// Converts markdown source into the XHTML body of a chapter.
pub trait ContentRenderer: Send + Sync {
    fn render(&self, markdown: &[u8]) -> Result<String, RenderError>;
}

/// CommonMark + GFM-style extensions via `pulldown-cmark`.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    heading_ids: bool,
}

impl MarkdownRenderer {
    pub fn new(heading_ids: bool) -> Self {
        Self { heading_ids }
    }

    fn options() -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_HEADING_ATTRIBUTES
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ContentRenderer for MarkdownRenderer {
    fn render(&self, markdown: &[u8]) -> Result<String, RenderError> {
        let text = String::from_utf8_lossy(markdown);
        let parser = Parser::new_ext(&text, Self::options());

        let mut out = String::with_capacity(text.len() + text.len() / 2);
        if self.heading_ids {
            html::push_html(&mut out, with_heading_ids(parser).into_iter());
        } else {
            html::push_html(&mut out, parser);
        }
        debug!(markdown_bytes = markdown.len(), html_bytes = out.len(), "Rendered markdown");
        Ok(out)
    }
}

// ── Automatic heading ids ────────────────────────────────────────────────────

static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let slug = RE_NON_WORD.replace_all(&lower, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug.to_string()
    }
}

fn unique_slug(slug: String, seen: &mut HashMap<String, usize>) -> String {
    let count = seen.entry(slug.clone()).or_insert(0);
    let unique = if *count == 0 {
        slug
    } else {
        format!("{slug}-{count}")
    };
    *count += 1;
    unique
}

/// Give every heading without an explicit `{#id}` a slug id built from its
/// text. Duplicates get `-1`, `-2`, ... suffixes.
fn with_heading_ids(parser: Parser<'_>) -> Vec<Event<'_>> {
    let mut events: Vec<Event<'_>> = parser.collect();
    let mut seen = HashMap::new();

    let mut i = 0;
    while i < events.len() {
        if matches!(&events[i], Event::Start(Tag::Heading { id: None, .. })) {
            let mut text = String::new();
            let mut end = i + 1;
            while end < events.len() {
                match &events[end] {
                    Event::End(TagEnd::Heading(_)) => break,
                    Event::Text(t) | Event::Code(t) => text.push_str(t),
                    _ => {}
                }
                end += 1;
            }

            let slug = unique_slug(slugify(&text), &mut seen);
            if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
                *id = Some(CowStr::from(slug));
            }
            i = end;
        }
        i += 1;
    }
    events
}
