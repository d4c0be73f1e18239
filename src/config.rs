//! Configuration types for the converter, the HTTP server and logging.
//!
//! Conversion behaviour is controlled through [`ConversionConfig`], built via
//! its [`ConversionConfigBuilder`]. The server and logging settings are plain
//! structs filled in by the binary from flags and environment variables.

use crate::error::ConfigError;
use serde::Serialize;
use std::path::PathBuf;

/// File extension of every generated artifact.
pub const ARTIFACT_EXTENSION: &str = "azw3";

/// MIME type advertised for generated artifacts.
pub const ARTIFACT_MIME_TYPE: &str = "application/vnd.amazon.mobi8-ebook";

/// Configuration for a Markdown-to-AZW3 conversion.
///
/// # Example
/// ```rust
/// use md2azw3::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .language("de")
///     .cover_jpeg_quality(85)
///     .build()
///     .unwrap();
/// assert_eq!(config.language, "de");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ConversionConfig {
    /// BCP 47 language tag written into the book metadata. Default: `"en"`.
    pub language: String,

    /// Directory under which per-request workspaces are created.
    /// `None` uses the system temp directory.
    pub temp_root: Option<PathBuf>,

    /// Name prefix of each workspace directory. Default: `"md2azw3-"`.
    pub workspace_prefix: String,

    /// JPEG quality used when embedding the cover. Range: 1–100. Default: 90.
    pub cover_jpeg_quality: u8,

    /// Height in pixels of the generated cover thumbnail. Default: 330.
    pub thumbnail_height: u32,

    /// Give headings without an explicit id an automatic slug id. Default: true.
    pub heading_ids: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            temp_root: None,
            workspace_prefix: "md2azw3-".to_string(),
            cover_jpeg_quality: 90,
            thumbnail_height: 330,
            heading_ids: true,
        }
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn language(mut self, tag: impl Into<String>) -> Self {
        self.config.language = tag.into();
        self
    }

    pub fn temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_root = Some(dir.into());
        self
    }

    pub fn workspace_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.workspace_prefix = prefix.into();
        self
    }

    pub fn cover_jpeg_quality(mut self, quality: u8) -> Self {
        self.config.cover_jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn thumbnail_height(mut self, px: u32) -> Self {
        self.config.thumbnail_height = px.max(16);
        self
    }

    pub fn heading_ids(mut self, v: bool) -> Self {
        self.config.heading_ids = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConfigError> {
        let c = &self.config;
        if c.language.trim().is_empty() {
            return Err(ConfigError("language tag must not be empty".into()));
        }
        if c.workspace_prefix.contains(|ch: char| ch == '/' || ch == '\\') {
            return Err(ConfigError(format!(
                "workspace prefix must not contain path separators, got '{}'",
                c.workspace_prefix
            )));
        }
        if let Some(ref root) = c.temp_root {
            if !root.is_dir() {
                return Err(ConfigError(format!(
                    "temp root '{}' is not a directory",
                    root.display()
                )));
            }
        }
        Ok(self.config)
    }
}

/// Settings of the HTTP transport.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// TCP port to listen on. Default: 8081.
    pub port: u16,
    /// Production mode. Hides error details from JSON bodies. Default: false.
    pub production: bool,
    /// Maximum accepted request body in bytes. Default: 32 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            production: false,
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

/// Settings of the process-wide tracing subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive (`trace`, `debug`, `info`, ...). Default: `debug`.
    pub level: String,
    /// Emit JSON lines instead of compact text. Default: false.
    pub json: bool,
    /// Include source file and line of each event. Default: false.
    pub report_caller: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
            json: false,
            report_caller: false,
        }
    }
}
