//! The conversion orchestrator.
//!
//! [`Converter::convert`] runs one request through the pipeline:
//!
//! ```text
//! validate ─▶ render ─▶ title/author ─▶ cover ─▶ id ─▶ workspace ─▶ name ─▶ encode
//! ```
//!
//! Every step either succeeds or ends the request with a classified
//! [`ConvertError`], logged once where it originates. Nothing is retried and
//! nothing is cached. On success the returned [`Artifact`] owns the workspace
//! holding the output file; the directory is removed when the artifact (or
//! the stream made from it) is dropped.
//!
//! The conversion itself is blocking (file I/O, image decoding). Async callers
//! use [`Converter::convert_async`], which moves it onto tokio's blocking pool.

use crate::book::{BookDescription, Chapter, Language};
use crate::config::ConversionConfig;
use crate::error::{ConvertError, EncodeError};
use crate::pipeline::cover::{ImageCoverDecoder, ImageDecoder};
use crate::pipeline::encode::{ArtifactEncoder, Azw3Encoder};
use crate::pipeline::naming;
use crate::pipeline::render::{ContentRenderer, MarkdownRenderer};
use crate::pipeline::workspace::Workspace;
use crate::request::{ConversionRequest, RequestContext};
use crate::stream::ArtifactStream;
use serde::Serialize;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

/// Statistics about one successful conversion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionStats {
    pub markdown_bytes: usize,
    pub html_bytes: usize,
    pub artifact_bytes: u64,
    pub has_cover: bool,
    pub author_count: usize,
    pub duration_ms: u64,
}

/// A generated e-book file inside its request workspace.
///
/// The file stays valid for as long as the artifact (or the stream returned
/// by [`Artifact::into_stream`]) is alive.
#[derive(Debug)]
pub struct Artifact {
    workspace: Workspace,
    path: PathBuf,
    filename: String,
    book_id: u32,
    stats: ConversionStats,
}

impl Artifact {
    /// Location of the output file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Suggested download filename, e.g. `notes.azw3`.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn workspace_dir(&self) -> &Path {
        self.workspace.path()
    }

    /// Random identifier written into the book header.
    pub fn book_id(&self) -> u32 {
        self.book_id
    }

    pub fn stats(&self) -> &ConversionStats {
        &self.stats
    }

    /// Open the file as a byte stream that keeps the workspace alive until
    /// the stream is dropped.
    pub async fn into_stream(self) -> std::io::Result<ArtifactStream> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(ArtifactStream::new(file, self.workspace))
    }
}

/// Runs conversions. Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct Converter {
    config: ConversionConfig,
    renderer: Arc<dyn ContentRenderer>,
    decoder: Arc<dyn ImageDecoder>,
    encoder: Arc<dyn ArtifactEncoder>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConversionConfig::default())
    }
}

impl Converter {
    /// A converter with the markdown renderer, the `image` cover decoder and
    /// the AZW3 encoder, all configured from `config`.
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            renderer: Arc::new(MarkdownRenderer::new(config.heading_ids)),
            decoder: Arc::new(ImageCoverDecoder),
            encoder: Arc::new(Azw3Encoder::from_config(&config)),
            config,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ContentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn ArtifactEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert one request. Blocking.
    pub fn convert(
        &self,
        request: ConversionRequest,
        ctx: &RequestContext,
    ) -> Result<Artifact, ConvertError> {
        let span = info_span!("convert", request_id = %ctx.request_id);
        let _guard = span.enter();
        let started = Instant::now();

        // ── Step 1: Input validation ─────────────────────────────────────
        let Some(markdown) = request.markdown else {
            warn!("Rejected request without a markdown upload");
            return Err(ConvertError::MissingInput);
        };
        info!(
            filename = %markdown.filename,
            bytes = markdown.data.len(),
            "Starting conversion"
        );

        // ── Step 2: Render ───────────────────────────────────────────────
        let content = self.renderer.render(&markdown.data).map_err(|e| {
            error!(error = %e, filename = %markdown.filename, "Failed to render markdown");
            ConvertError::RenderFailure {
                detail: e.to_string(),
            }
        })?;

        // ── Steps 3-4: Title and author ──────────────────────────────────
        let title = request
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| naming::derive_title(&markdown.filename));
        let authors: Vec<String> = request.author.filter(|a| !a.is_empty()).into_iter().collect();

        // ── Step 5: Cover ────────────────────────────────────────────────
        let cover = match request.cover {
            Some(upload) => {
                let img = self.decoder.decode(&upload.data).map_err(|source| {
                    error!(
                        error = %source,
                        filename = %upload.filename,
                        bytes = upload.data.len(),
                        "Failed to decode cover image"
                    );
                    ConvertError::CoverDecodeFailure { source }
                })?;
                Some(img)
            }
            None => None,
        };

        // ── Step 6: Book description ─────────────────────────────────────
        let html_bytes = content.len();
        let mut book = BookDescription::new(
            title.clone(),
            rand::random::<u32>(),
            Chapter::new(title, content),
        );
        book.authors = authors;
        book.language = Language::new(self.config.language.clone());
        book.cover = cover;
        debug!(
            title = %book.title,
            unique_id = book.unique_id,
            authors = book.authors.len(),
            cover = book.cover.is_some(),
            "Assembled book description"
        );

        // ── Step 7: Workspace ────────────────────────────────────────────
        let root = self.config.temp_root.as_deref();
        let workspace = Workspace::create(root, &self.config.workspace_prefix).map_err(|source| {
            let path = root.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
            error!(error = %source, root = %path.display(), "Failed to create workspace");
            ConvertError::ResourceFailure {
                what: "workspace",
                path,
                source,
            }
        })?;

        // ── Step 8: Output naming ────────────────────────────────────────
        let filename = naming::output_filename(&markdown.filename);
        let (path, file) = workspace.create_file(&filename).map_err(|source| {
            let path = workspace.path().join(&filename);
            error!(error = %source, path = %path.display(), "Failed to create output file");
            ConvertError::ResourceFailure {
                what: "output file",
                path,
                source,
            }
        })?;

        // ── Step 9: Encode ───────────────────────────────────────────────
        let encode_failed = |source: EncodeError| {
            error!(error = %source, path = %path.display(), "Failed to generate azw3");
            ConvertError::EncodeFailure {
                path: path.clone(),
                source,
            }
        };
        let mut out = BufWriter::new(file);
        self.encoder.encode(&book, &mut out).map_err(encode_failed)?;
        let file = out
            .into_inner()
            .map_err(|e| encode_failed(EncodeError::Io(e.into_error())))?;

        // ── Step 10: Completion ──────────────────────────────────────────
        let artifact_bytes = file.metadata().map(|m| m.len()).map_err(|source| {
            error!(error = %source, path = %path.display(), "Failed to stat output file");
            ConvertError::ResourceFailure {
                what: "output file",
                path: path.clone(),
                source,
            }
        })?;
        drop(file);
        let stats = ConversionStats {
            markdown_bytes: markdown.data.len(),
            html_bytes,
            artifact_bytes,
            has_cover: book.cover.is_some(),
            author_count: book.authors.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            filename = %filename,
            bytes = stats.artifact_bytes,
            duration_ms = stats.duration_ms,
            "Conversion complete"
        );

        Ok(Artifact {
            workspace,
            path,
            filename,
            book_id: book.unique_id,
            stats,
        })
    }

    /// Run [`Converter::convert`] on tokio's blocking pool.
    ///
    /// A panic inside the conversion is resumed on the caller's task so
    /// panic-catching middleware sees it.
    pub async fn convert_async(
        &self,
        request: ConversionRequest,
        ctx: RequestContext,
    ) -> Result<Artifact, ConvertError> {
        let this = self.clone();
        match tokio::task::spawn_blocking(move || this.convert(request, &ctx)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(source) => Err(ConvertError::Interrupted { source }),
        }
    }
}

/// Convert a request and write the artifact to `output`.
///
/// Uses atomic write (temp file + rename) so `output` never holds a partial
/// book. Parent directories are created as needed.
pub async fn convert_to_file(
    request: ConversionRequest,
    output: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, ConvertError> {
    let output = output.as_ref();
    let converter = Converter::new(config.clone());
    let artifact = converter
        .convert_async(request, RequestContext::generate())
        .await?;

    let write_failed = |source: std::io::Error| ConvertError::ResourceFailure {
        what: "output file",
        path: output.to_path_buf(),
        source,
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }
    let tmp_path = output.with_extension("azw3.tmp");
    tokio::fs::copy(artifact.path(), &tmp_path)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, output)
        .await
        .map_err(write_failed)?;

    info!(path = %output.display(), "Wrote artifact");
    Ok(artifact.stats().clone())
}
