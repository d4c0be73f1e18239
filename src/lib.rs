//! # md2azw3
//!
//! Convert Markdown documents into Kindle AZW3 (KF8) e-books, either through
//! an HTTP service or directly from Rust.
//!
//! ## Pipeline Overview
//!
//! ```text
//! multipart upload / local file
//!  │
//!  ├─ 1. Validate   a markdown upload must be present
//!  ├─ 2. Render     Markdown → XHTML fragment (pulldown-cmark)
//!  ├─ 3. Describe   title, author, decoded cover, random book id
//!  ├─ 4. Workspace  private temp directory per request
//!  ├─ 5. Encode     KF8 container written into the workspace
//!  └─ 6. Deliver    streamed as an attachment; workspace removed after
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2azw3::{ConversionConfig, ConversionRequest, Upload, convert_to_file};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = ConversionRequest::new(Upload::markdown_from_path("notes.md")?)
//!         .with_author("Ann");
//!     let stats = convert_to_file(request, "notes.azw3", &ConversionConfig::default()).await?;
//!     eprintln!("{} bytes in {}ms", stats.artifact_bytes, stats.duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2azw3` binary (clap + anyhow) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! md2azw3 = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod azw3;
pub mod book;
pub mod config;
pub mod convert;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod request;
pub mod server;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use book::{BookDescription, Chapter, Language};
pub use config::{ConversionConfig, ConversionConfigBuilder, LoggingConfig, ServerConfig};
pub use convert::{convert_to_file, Artifact, ConversionStats, Converter};
pub use error::{ConfigError, ConvertError, EncodeError, ErrorKind};
pub use request::{ConversionRequest, RequestContext, Upload};
pub use stream::ArtifactStream;
