//! Access logging and panic recovery.

use super::error::ApiError;
use super::handlers::REQUEST_ID_HEADER;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use std::any::Any;
use std::time::Duration;
use tower_http::trace::{MakeSpan, OnResponse};
use tracing::Span;

/// Opens the `http` span every request's log lines nest under.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        tracing::info_span!(
            "http",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

/// Logs status and latency once the response head is ready.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AccessLog;

impl<B> OnResponse<B> for AccessLog {
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
        let status = response.status().as_u16();
        let latency_ms = latency.as_millis() as u64;
        if response.status().is_server_error() {
            tracing::error!(status, latency_ms, "request failed");
        } else if response.status().is_client_error() {
            tracing::warn!(status, latency_ms, "client error");
        } else {
            tracing::info!(status, latency_ms, "request completed");
        }
    }
}

/// Response for a panicking handler: generic 500, process keeps running.
pub(crate) fn panic_response(err: Box<dyn Any + Send + 'static>) -> axum::response::Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(panic = %detail, "Request handler panicked");
    ApiError::internal().into_response()
}
