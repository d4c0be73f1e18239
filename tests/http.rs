//! HTTP-level tests: the router driven in-process with `tower::ServiceExt`.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use md2azw3::pipeline::render::{ContentRenderer, RenderError};
use md2azw3::{server, ConversionConfig, Converter, ServerConfig};
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "md2azw3-test-boundary";

// ── Test helpers ─────────────────────────────────────────────────────────────

enum Part<'a> {
    File(&'a str, &'a str, &'a [u8]),
    Text(&'a str, &'a str),
}

fn multipart(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn convert_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::post("/convert")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart(parts)))
        .unwrap()
}

fn app(root: &Path, server: ServerConfig) -> Router {
    let config = ConversionConfig::builder().temp_root(root).build().unwrap();
    server::router(Converter::new(config), &server)
}

fn dev_app(root: &Path) -> Router {
    app(root, ServerConfig::default())
}

async fn json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(24, 32, image::Rgba([10, 120, 200, 255]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

// ── /health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let root = tempfile::tempdir().unwrap();
    let response = dev_app(root.path())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await, serde_json::json!({ "status": "ok" }));
}

// ── /convert success ─────────────────────────────────────────────────────────

#[tokio::test]
async fn markdown_upload_returns_attachment() {
    let root = tempfile::tempdir().unwrap();
    let response = dev_app(root.path())
        .oneshot(convert_request(&[Part::File("markdown", "hello.md", b"# Hello")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers[header::CONTENT_TYPE],
        "application/vnd.amazon.mobi8-ebook"
    );
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"hello.azw3\""
    );
    let declared: usize = headers[header::CONTENT_LENGTH]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    // The workspace lives exactly as long as the body.
    assert_eq!(entries(root.path()), 1);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.len(), declared);
    assert_eq!(&bytes[60..68], b"BOOKMOBI");
    assert_eq!(entries(root.path()), 0);
}

#[tokio::test]
async fn cover_title_and_author_are_accepted() {
    let root = tempfile::tempdir().unwrap();
    let cover = png_bytes();
    let response = dev_app(root.path())
        .oneshot(convert_request(&[
            Part::File("markdown", "draft.md", b"Body text."),
            Part::File("cover", "cover.png", &cover),
            Part::Text("title", "My Book"),
            Part::Text("author", "Jane"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("My Book"));
    assert!(text.contains("Jane"));
    assert!(text.contains("EXTH"));
}

// ── /convert failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_markdown_is_bad_request() {
    let root = tempfile::tempdir().unwrap();
    let response = dev_app(root.path())
        .oneshot(convert_request(&[Part::Text("title", "No body")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await;
    assert_eq!(body["error"], "markdown file is required");
    assert_eq!(entries(root.path()), 0);
}

#[tokio::test]
async fn markdown_text_field_is_not_an_upload() {
    let root = tempfile::tempdir().unwrap();
    let response = dev_app(root.path())
        .oneshot(convert_request(&[Part::Text("markdown", "# Hello")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bad_cover_is_server_error_with_details_in_dev() {
    let root = tempfile::tempdir().unwrap();
    let response = dev_app(root.path())
        .oneshot(convert_request(&[
            Part::File("markdown", "a.md", b"# A"),
            Part::File("cover", "cover.jpg", b"not an image at all"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json(response).await;
    assert_eq!(body["error"], "failed to process cover image");
    assert!(body["details"].is_string());
    assert_eq!(entries(root.path()), 0);
}

#[tokio::test]
async fn production_mode_hides_details() {
    let root = tempfile::tempdir().unwrap();
    let server = ServerConfig {
        production: true,
        ..ServerConfig::default()
    };
    let response = app(root.path(), server)
        .oneshot(convert_request(&[
            Part::File("markdown", "a.md", b"# A"),
            Part::File("cover", "cover.jpg", b"not an image at all"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json(response).await,
        serde_json::json!({ "error": "failed to process cover image" })
    );
}

#[tokio::test]
async fn non_multipart_body_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let request = Request::post("/convert")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = dev_app(root.path()).oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
    let body = json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("invalid multipart request"));
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let root = tempfile::tempdir().unwrap();
    let server = ServerConfig {
        max_upload_bytes: 256,
        ..ServerConfig::default()
    };
    let big = vec![b'x'; 4096];
    let response = app(root.path(), server)
        .oneshot(convert_request(&[Part::File("markdown", "big.md", &big)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(entries(root.path()), 0);
}

#[tokio::test]
async fn panic_in_conversion_becomes_internal_error() {
    struct Exploding;

    impl ContentRenderer for Exploding {
        fn render(&self, _markdown: &[u8]) -> Result<String, RenderError> {
            panic!("renderer blew up");
        }
    }

    let root = tempfile::tempdir().unwrap();
    let config = ConversionConfig::builder()
        .temp_root(root.path())
        .build()
        .unwrap();
    let converter = Converter::new(config).with_renderer(Arc::new(Exploding));
    let app = server::router(converter, &ServerConfig::default());

    let response = app
        .oneshot(convert_request(&[Part::File("markdown", "a.md", b"# A")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json(response).await,
        serde_json::json!({ "error": "internal server error" })
    );
    assert_eq!(entries(root.path()), 0);
}

// ── Middleware ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn request_id_is_echoed() {
    let root = tempfile::tempdir().unwrap();
    let request = Request::get("/health")
        .header("x-request-id", "trace-me-42")
        .body(Body::empty())
        .unwrap();
    let response = dev_app(root.path()).oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "trace-me-42");
}

#[tokio::test]
async fn request_id_is_generated_when_absent() {
    let root = tempfile::tempdir().unwrap();
    let response = dev_app(root.path())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let id = response.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(id.len(), 36, "expected a UUID, got '{id}'");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let root = tempfile::tempdir().unwrap();
    let response = dev_app(root.path())
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
