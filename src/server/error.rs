//! HTTP error responses.
//!
//! Handlers return `Result<_, ApiError>`. The body is always
//! `{"error": "<client message>"}`; outside production mode a `details`
//! field carries the full error chain for debugging.

use crate::error::ConvertError;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::error::Error as StdError;

pub(crate) const PAYLOAD_TOO_LARGE_MESSAGE: &str = "upload exceeds the configured size limit";
pub(crate) const INTERNAL_MESSAGE: &str = "internal server error";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// An error rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Option<String>,
}

/// `error: cause: cause...` for the whole source chain.
fn chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }

    pub fn payload_too_large() -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, PAYLOAD_TOO_LARGE_MESSAGE)
    }

    /// Attach `err` as details unless running in production.
    pub fn with_details(mut self, err: &dyn StdError, production: bool) -> Self {
        if !production {
            self.details = Some(chain(err));
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn from_convert(err: &ConvertError, production: bool) -> Self {
        let kind = err.kind();
        let status =
            StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, kind.client_message()).with_details(err, production)
    }

    /// A multipart stream error outside the markdown payload.
    pub fn from_multipart(err: &MultipartError, production: bool) -> Self {
        let status = err.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::payload_too_large();
        }
        Self::new(status, format!("invalid multipart request: {}", err.body_text()))
            .with_details(err, production)
    }

    /// The request is not a readable multipart form at all.
    pub fn from_rejection(rejection: &MultipartRejection) -> Self {
        Self::new(
            rejection.status(),
            format!("invalid multipart request: {}", rejection.body_text()),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}
