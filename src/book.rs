//! The book description handed from the orchestrator to the encoder.

use chrono::{DateTime, Utc};
use image::DynamicImage;

/// A named unit of rendered XHTML content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    /// Rendered XHTML body content (no `<html>`/`<body>` wrapper).
    pub content: String,
}

impl Chapter {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Language of the book: the BCP 47 tag and the Windows LCID the MOBI
/// header stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    tag: String,
}

impl Language {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Primary-language LCID; unknown tags fall back to English.
    pub fn lcid(&self) -> u32 {
        let primary = self
            .tag
            .split(|c: char| c == '-' || c == '_')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "ar" => 0x01,
            "bg" => 0x02,
            "ca" => 0x03,
            "zh" => 0x04,
            "cs" => 0x05,
            "da" => 0x06,
            "de" => 0x07,
            "el" => 0x08,
            "en" => 0x09,
            "es" => 0x0a,
            "fi" => 0x0b,
            "fr" => 0x0c,
            "he" => 0x0d,
            "hu" => 0x0e,
            "is" => 0x0f,
            "it" => 0x10,
            "ja" => 0x11,
            "ko" => 0x12,
            "nl" => 0x13,
            "no" | "nb" | "nn" => 0x14,
            "pl" => 0x15,
            "pt" => 0x16,
            "ro" => 0x18,
            "ru" => 0x19,
            "hr" => 0x1a,
            "sk" => 0x1b,
            "sv" => 0x1d,
            "th" => 0x1e,
            "tr" => 0x1f,
            "uk" => 0x22,
            "fa" => 0x29,
            "vi" => 0x2a,
            "hi" => 0x39,
            _ => 0x09,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::new("en")
    }
}

/// Everything the encoder needs to produce one artifact.
///
/// The chapter list is private so that it can never be empty: the only
/// constructor takes the first chapter.
#[derive(Debug, Clone)]
pub struct BookDescription {
    pub title: String,
    pub authors: Vec<String>,
    /// Random per-call identity; best-effort unique.
    pub unique_id: u32,
    pub created_at: DateTime<Utc>,
    pub language: Language,
    pub cover: Option<DynamicImage>,
    chapters: Vec<Chapter>,
}

impl BookDescription {
    /// A book with a single chapter and no authors or cover.
    pub fn new(title: impl Into<String>, unique_id: u32, chapter: Chapter) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            unique_id,
            created_at: Utc::now(),
            language: Language::default(),
            cover: None,
            chapters: vec![chapter],
        }
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn push_chapter(&mut self, chapter: Chapter) {
        self.chapters.push(chapter);
    }
}
