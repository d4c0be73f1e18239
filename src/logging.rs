//! Process-wide tracing subscriber.
//!
//! Library code only emits `tracing` events; the binary calls [`init`] once
//! at startup. `RUST_LOG` overrides the configured level when set.

use crate::config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("the name for log level is not valid: '{0}'")]
    InvalidLevel(String),

    #[error("failed to install the global subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Parse a level name. `fatal` and `panic` are accepted as `error`.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "error" | "fatal" | "panic" => Ok(LevelFilter::ERROR),
        "off" => Ok(LevelFilter::OFF),
        _ => Err(LoggingError::InvalidLevel(level.to_string())),
    }
}

fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the global subscriber: compact text, or JSON lines when
/// `config.json` is set. `report_caller` adds source file and line.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let level = parse_level(&config.level)?;
    let caller = config.report_caller;
    let registry = tracing_subscriber::registry().with(env_filter(level));

    if config.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_file(caller)
                    .with_line_number(caller),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_file(caller)
                    .with_line_number(caller),
            )
            .try_init()?;
    }
    Ok(())
}
