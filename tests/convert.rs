//! Integration tests for the conversion orchestrator.
//!
//! Collaborators are swapped through the `Converter::with_*` seams to
//! observe the book description and to force failures at each step.

use md2azw3::pipeline::encode::{ArtifactEncoder, Azw3Encoder};
use md2azw3::pipeline::render::{ContentRenderer, RenderError};
use md2azw3::{
    BookDescription, ConversionConfig, ConversionRequest, Converter, EncodeError, ErrorKind,
    RequestContext, Upload,
};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn config(root: &Path) -> ConversionConfig {
    ConversionConfig::builder().temp_root(root).build().unwrap()
}

fn ctx(id: &str) -> RequestContext {
    RequestContext::new(id)
}

fn markdown(name: &str, body: &str) -> Upload {
    Upload::new(name, body.as_bytes())
}

fn jpeg_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(40, 60, image::Rgb([200, 40, 40]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// Records every book it is asked to encode, then delegates to the real
/// encoder.
#[derive(Default)]
struct Recording {
    books: Mutex<Vec<BookDescription>>,
}

impl ArtifactEncoder for Recording {
    fn encode(&self, book: &BookDescription, out: &mut dyn Write) -> Result<(), EncodeError> {
        self.books.lock().unwrap().push(book.clone());
        Azw3Encoder::default().encode(book, out)
    }
}

struct BrokenEncoder;

impl ArtifactEncoder for BrokenEncoder {
    fn encode(&self, _book: &BookDescription, out: &mut dyn Write) -> Result<(), EncodeError> {
        out.write_all(b"BOOKMOBI partial")?;
        Err(EncodeError::Io(std::io::Error::other("disk full")))
    }
}

struct RejectingRenderer;

impl ContentRenderer for RejectingRenderer {
    fn render(&self, _markdown: &[u8]) -> Result<String, RenderError> {
        Err(RenderError("unsupported construct".into()))
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn markdown_only_produces_single_chapter_book() {
    let root = tempfile::tempdir().unwrap();
    let recording = Arc::new(Recording::default());
    let converter = Converter::new(config(root.path())).with_encoder(recording.clone());

    let artifact = converter
        .convert(ConversionRequest::new(markdown("hello.md", "# Hello")), &ctx("a"))
        .unwrap();

    assert_eq!(artifact.filename(), "hello.azw3");
    let bytes = std::fs::read(artifact.path()).unwrap();
    assert_eq!(&bytes[60..68], b"BOOKMOBI");
    assert_eq!(artifact.stats().artifact_bytes, bytes.len() as u64);

    let books = recording.books.lock().unwrap();
    let book = &books[0];
    assert_eq!(book.title, "hello");
    assert!(book.authors.is_empty());
    assert!(book.cover.is_none());
    assert_eq!(book.chapters().len(), 1);
    assert!(book.chapters()[0].content.contains("Hello</h1>"));
    assert_eq!(book.unique_id, artifact.book_id());
}

#[test]
fn title_author_and_cover_reach_the_book() {
    let root = tempfile::tempdir().unwrap();
    let recording = Arc::new(Recording::default());
    let converter = Converter::new(config(root.path())).with_encoder(recording.clone());

    let request = ConversionRequest::new(markdown("draft.md", "Some *text*."))
        .with_cover(Upload::new("cover.jpg", jpeg_bytes()))
        .with_title("My Book")
        .with_author("Jane");
    let artifact = converter.convert(request, &ctx("b")).unwrap();

    let books = recording.books.lock().unwrap();
    let book = &books[0];
    assert_eq!(book.title, "My Book");
    assert_eq!(book.authors, vec!["Jane".to_string()]);
    let cover = book.cover.as_ref().expect("cover decoded");
    assert_eq!((cover.width(), cover.height()), (40, 60));
    assert!(artifact.stats().has_cover);
    assert_eq!(artifact.stats().author_count, 1);
    // Filename follows the upload, not the title.
    assert_eq!(artifact.filename(), "draft.azw3");
}

#[test]
fn undecodable_cover_fails_before_any_workspace_exists() {
    let root = tempfile::tempdir().unwrap();
    let converter = Converter::new(config(root.path()));

    let request = ConversionRequest::new(markdown("a.md", "# A"))
        .with_cover(Upload::new("cover.png", b"definitely not an image".to_vec()));
    let err = converter.convert(request, &ctx("c")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CoverDecodeFailure);
    assert_eq!(err.kind().status_code(), 500);
    assert_eq!(entries(root.path()), 0);
}

#[test]
fn missing_markdown_touches_nothing() {
    let root = tempfile::tempdir().unwrap();
    let converter = Converter::new(config(root.path()));

    let request = ConversionRequest {
        title: Some("Orphan".into()),
        cover: Some(Upload::new("cover.jpg", jpeg_bytes())),
        ..ConversionRequest::default()
    };
    let err = converter.convert(request, &ctx("d")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingInput);
    assert_eq!(err.kind().client_message(), "markdown file is required");
    assert_eq!(entries(root.path()), 0);
}

#[test]
fn renderer_failure_is_classified() {
    let root = tempfile::tempdir().unwrap();
    let converter =
        Converter::new(config(root.path())).with_renderer(Arc::new(RejectingRenderer));

    let err = converter
        .convert(ConversionRequest::new(markdown("a.md", "x")), &ctx("e"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RenderFailure);
    assert!(err.to_string().contains("unsupported construct"));
    assert_eq!(entries(root.path()), 0);
}

#[test]
fn encoder_failure_leaves_no_partial_artifact() {
    let root = tempfile::tempdir().unwrap();
    let converter = Converter::new(config(root.path())).with_encoder(Arc::new(BrokenEncoder));

    let err = converter
        .convert(ConversionRequest::new(markdown("a.md", "# A")), &ctx("f"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EncodeFailure);
    assert_eq!(err.kind().client_message(), "failed to generate azw3");
    // The workspace holding the partial file was removed with the error.
    assert_eq!(entries(root.path()), 0);
}

#[test]
fn unusable_temp_root_is_a_resource_failure() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = config(root.path());
    cfg.temp_root = Some(root.path().join("gone"));

    let err = Converter::new(cfg)
        .convert(ConversionRequest::new(markdown("a.md", "# A")), &ctx("g"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ResourceFailure);
    assert_eq!(err.kind().client_message(), "internal server error");
}

#[test]
fn every_call_gets_a_fresh_identity() {
    let root = tempfile::tempdir().unwrap();
    let converter = Converter::new(config(root.path()));

    let ids: HashSet<u32> = (0..8)
        .map(|i| {
            converter
                .convert(
                    ConversionRequest::new(markdown("same.md", "# Same")),
                    &ctx(&format!("id-{i}")),
                )
                .unwrap()
                .book_id()
        })
        .collect();

    assert!(ids.len() > 1, "identical inputs must not share one book id");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_conversions_are_isolated() {
    let root = tempfile::tempdir().unwrap();
    let recording = Arc::new(Recording::default());
    let converter = Converter::new(config(root.path())).with_encoder(recording.clone());

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let converter = converter.clone();
            tokio::spawn(async move {
                let request = ConversionRequest::new(markdown(
                    &format!("doc{i}.md"),
                    &format!("# Document {i}\n\nbody {i}"),
                ))
                .with_title(format!("Title {i}"));
                converter
                    .convert_async(request, RequestContext::new(format!("req-{i}")))
                    .await
                    .map(|artifact| (i, artifact))
            })
        })
        .collect();

    let mut artifacts = Vec::new();
    for task in tasks {
        artifacts.push(task.await.unwrap().unwrap());
    }

    let dirs: HashSet<_> = artifacts
        .iter()
        .map(|(_, a)| a.workspace_dir().to_path_buf())
        .collect();
    assert_eq!(dirs.len(), artifacts.len());
    for (i, artifact) in &artifacts {
        assert_eq!(artifact.filename(), format!("doc{i}.azw3"));
        assert!(artifact.path().starts_with(artifact.workspace_dir()));
    }

    for book in recording.books.lock().unwrap().iter() {
        let n = book.title.trim_start_matches("Title ");
        assert!(
            book.chapters()[0].content.contains(&format!("Document {n}")),
            "chapter content of '{}' belongs to another request",
            book.title
        );
    }

    assert_eq!(entries(root.path()), artifacts.len());
    drop(artifacts);
    assert_eq!(entries(root.path()), 0);
}
