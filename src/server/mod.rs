//! HTTP transport: axum router, middleware stack and server loop.
//!
//! ```text
//! POST /convert   multipart (markdown, cover, title, author) → AZW3 attachment
//! GET  /health    {"status":"ok"}
//! ```
//!
//! Middleware, outermost first: request id (`x-request-id`, generated as a
//! UUID when absent, echoed on the response), access log, panic recovery,
//! body size limit.

pub mod body;
mod error;
mod extract;
mod handlers;
mod trace;

pub use error::{ApiError, ErrorResponse};
pub use handlers::HealthResponse;

use crate::config::ServerConfig;
use crate::convert::Converter;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared, read-only handler state.
pub(crate) struct AppState {
    pub converter: Converter,
    pub production: bool,
}

/// Build the application router.
pub fn router(converter: Converter, config: &ServerConfig) -> Router {
    let state = Arc::new(AppState {
        converter,
        production: config.production,
    });

    Router::new()
        .route("/convert", post(handlers::convert))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(CatchPanicLayer::custom(trace::panic_response))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::RequestSpan)
                .on_response(trace::AccessLog),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Bind `0.0.0.0:<port>` and serve until Ctrl+C or SIGTERM.
pub async fn serve(converter: Converter, config: ServerConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(
        addr = %addr,
        production = config.production,
        max_upload_bytes = config.max_upload_bytes,
        temp_root = ?converter.config().temp_root,
        "Server ready and accepting connections"
    );

    axum::serve(listener, router(converter, &config))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Resolves on Ctrl+C (SIGINT) or SIGTERM.
///
/// # Panics
/// Panics if a signal handler cannot be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }

    info!("Shutting down gracefully...");
}
