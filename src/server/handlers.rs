//! Route handlers.

use super::error::ApiError;
use super::{body, extract, AppState};
use crate::request::RequestContext;
use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

pub(crate) const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /health`. Never touches the converter.
pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// `POST /convert`: multipart upload in, AZW3 attachment out.
pub(crate) async fn convert(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response<Body>, ApiError> {
    let ctx = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(RequestContext::new)
        .unwrap_or_else(RequestContext::generate);

    let multipart = multipart.map_err(|rejection| {
        warn!(request_id = %ctx.request_id, error = %rejection, "Rejected non-multipart request");
        ApiError::from_rejection(&rejection)
    })?;
    let request = extract::conversion_request(multipart, state.production).await?;

    let artifact = state
        .converter
        .convert_async(request, ctx)
        .await
        .map_err(|e| ApiError::from_convert(&e, state.production))?;

    body::attachment(artifact).await
}
