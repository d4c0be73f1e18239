//! CLI binary for md2azw3.
//!
//! A thin shim over the library crate: `serve` runs the HTTP service,
//! `convert` turns one local markdown file into an AZW3 book.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use md2azw3::pipeline::naming::output_filename;
use md2azw3::{
    convert_to_file, logging, server, ConversionConfig, ConversionRequest, Converter,
    LoggingConfig, ServerConfig, Upload,
};
use std::path::{Path, PathBuf};
use tracing::info;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = "\
EXAMPLES:
  # Run the HTTP service on the default port (8081)
  md2azw3 serve

  # Production mode on a custom port, JSON logs
  HTTP_PORT=9000 IS_PRODUCTION_MODE=true LOGGER_IS_PRETTY_PRINT=true md2azw3 serve

  # Convert a file locally (writes notes.azw3 next to notes.md)
  md2azw3 convert notes.md --title \"My Notes\" --author \"Ann\"

  # Upload through the service
  curl -F markdown=@notes.md -F cover=@cover.png -F title=Notes \\
       -o notes.azw3 http://localhost:8081/convert

ENVIRONMENT:
  HTTP_PORT                     Listen port (serve)
  IS_PRODUCTION_MODE            Hide error details in responses
  LOGGER_LEVEL                  trace | debug | info | warn | error
  LOGGER_IS_PRETTY_PRINT        Emit structured JSON log lines
  LOGGER_IS_REPORT_CALLER_MODE  Include source file and line in logs
  MD2AZW3_TEMP_DIR              Root directory for per-request workspaces
  MD2AZW3_MAX_UPLOAD_BYTES      Largest accepted request body
  MD2AZW3_LANGUAGE              Language tag written into books
  MD2AZW3_COVER_QUALITY         JPEG quality of embedded covers (1-100)
  RUST_LOG                      Overrides LOGGER_LEVEL with full filter syntax
";

#[derive(Parser, Debug)]
#[command(
    name = "md2azw3",
    version,
    about = "Convert Markdown documents to Kindle AZW3 e-books",
    long_about = "Convert Markdown documents to Kindle AZW3 e-books.\n\n\
                  Runs as an HTTP service accepting multipart uploads, or converts \
                  a single local file.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP,
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    logging: LoggingArgs,

    #[command(flatten)]
    conversion: ConversionArgs,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default).
    Serve,
    /// Convert one local markdown file.
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
struct LoggingArgs {
    /// Log level.
    #[arg(long, global = true, env = "LOGGER_LEVEL", default_value = "debug")]
    log_level: String,

    /// Emit JSON log lines instead of compact text.
    #[arg(long, global = true, env = "LOGGER_IS_PRETTY_PRINT")]
    log_json: bool,

    /// Include source file and line in every log line.
    #[arg(long, global = true, env = "LOGGER_IS_REPORT_CALLER_MODE")]
    log_caller: bool,
}

#[derive(Args, Debug)]
struct ConversionArgs {
    /// Root directory for per-request workspaces (default: system temp dir).
    #[arg(long, global = true, env = "MD2AZW3_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Language tag written into generated books.
    #[arg(long, global = true, env = "MD2AZW3_LANGUAGE", default_value = "en")]
    language: String,

    /// JPEG quality for embedded covers (1–100).
    #[arg(long, global = true, env = "MD2AZW3_COVER_QUALITY", default_value_t = 90)]
    cover_quality: u8,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// TCP port to listen on.
    #[arg(long, global = true, env = "HTTP_PORT", default_value_t = 8081)]
    port: u16,

    /// Hide error details from response bodies.
    #[arg(long, global = true, env = "IS_PRODUCTION_MODE")]
    production: bool,

    /// Largest accepted request body in bytes.
    #[arg(
        long,
        global = true,
        env = "MD2AZW3_MAX_UPLOAD_BYTES",
        default_value_t = 32 * 1024 * 1024
    )]
    max_upload_bytes: usize,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Markdown file to convert.
    markdown: PathBuf,

    /// Cover image (PNG or JPEG).
    #[arg(long)]
    cover: Option<PathBuf>,

    /// Book title (default: derived from the file name).
    #[arg(long)]
    title: Option<String>,

    /// Book author.
    #[arg(long)]
    author: Option<String>,

    /// Output path (default: next to the input, with an .azw3 extension).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn build_config(args: &ConversionArgs) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .language(&args.language)
        .cover_jpeg_quality(args.cover_quality);
    if let Some(ref dir) = args.temp_dir {
        builder = builder.temp_root(dir);
    }
    builder.build().context("Invalid conversion configuration")
}

fn default_output(markdown: &Path) -> PathBuf {
    let name = markdown
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    markdown.with_file_name(output_filename(&name))
}

fn server_config(args: &ServeArgs) -> ServerConfig {
    ServerConfig {
        port: args.port,
        production: args.production,
        max_upload_bytes: args.max_upload_bytes,
    }
}

/// Startup banner: version, listen address and effective configuration.
fn banner(server: &ServerConfig, config: &ConversionConfig) -> String {
    format!(
        "{}  {}  {}\n   production={}  max_upload={}  language={}",
        bold("md2azw3"),
        dim(env!("CARGO_PKG_VERSION")),
        cyan(&format!("http://0.0.0.0:{}", server.port)),
        server.production,
        dim(&server.max_upload_bytes.to_string()),
        config.language,
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli.conversion)?;
    let command = cli.command.unwrap_or(Command::Serve);
    let server = server_config(&cli.serve);

    if matches!(command, Command::Serve) {
        eprintln!("{}", banner(&server, &config));
    }

    // ── Logging setup ────────────────────────────────────────────────────
    logging::init(&LoggingConfig {
        level: cli.logging.log_level.clone(),
        json: cli.logging.log_json,
        report_caller: cli.logging.log_caller,
    })
    .context("Failed to set up logging")?;
    info!("logger is setup successfully");

    match command {
        Command::Serve => serve(server, config).await,
        Command::Convert(args) => convert(args, config).await,
    }
}

async fn serve(server_config: ServerConfig, config: ConversionConfig) -> Result<()> {
    server::serve(Converter::new(config), server_config)
        .await
        .context("HTTP server failed")
}

async fn convert(args: ConvertArgs, config: ConversionConfig) -> Result<()> {
    let markdown = Upload::markdown_from_path(&args.markdown)
        .with_context(|| format!("Failed to read '{}'", args.markdown.display()))?;
    let mut request = ConversionRequest::new(markdown);
    if let Some(ref cover) = args.cover {
        let cover = Upload::cover_from_path(cover)
            .with_context(|| format!("Failed to read cover '{}'", cover.display()))?;
        request = request.with_cover(cover);
    }
    if let Some(title) = args.title {
        request = request.with_title(title);
    }
    if let Some(author) = args.author {
        request = request.with_author(author);
    }

    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.markdown));

    match convert_to_file(request, &output, &config).await {
        Ok(stats) => {
            eprintln!(
                "{}  {} bytes  {}ms  →  {}",
                green("✔"),
                stats.artifact_bytes,
                stats.duration_ms,
                bold(&output.display().to_string()),
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{}  {}", red("✘"), red(&e.to_string()));
            Err(e).context("Conversion failed")
        }
    }
}
