//! Endpoint handlers.

use super::error::ApiError;
use super::AppState;
use crate::bulk::capture_bulk;
use crate::capture::try_capture;
use crate::output::{BulkScreenshotRequest, ScreenshotRequest, ScreenshotResult};
use axum::{
    extract::{rejection::JsonRejection, Extension, Json},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

const X_PROCESSING_TIME: HeaderName = HeaderName::from_static("x-processing-time");
const X_SUCCESS_RATE: HeaderName = HeaderName::from_static("x-success-rate");
const X_SPEED_MODE: HeaderName = HeaderName::from_static("x-speed-mode");

/// `POST /screenshot`
pub async fn screenshot(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<ScreenshotRequest>, JsonRejection>,
) -> Result<Json<ScreenshotResult>, ApiError> {
    let Json(request) = payload?;
    let image_url = try_capture(&request.url, &state.config).await?;
    Ok(Json(ScreenshotResult::success(image_url)))
}

/// `POST /bulk-screenshot`
pub async fn bulk_screenshot(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<BulkScreenshotRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let start = Instant::now();
    let Json(request) = payload?;
    let archive = capture_bulk(&request, &state.config).await?;
    let processing_ms = start.elapsed().as_millis();

    info!(
        "Bulk request served: {} ({} bytes, {}ms)",
        archive.stats.success_rate(),
        archive.bytes.len(),
        processing_ms
    );

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", archive.filename),
        ),
        (X_PROCESSING_TIME, format!("{processing_ms}ms")),
        (X_SUCCESS_RATE, archive.stats.success_rate()),
        (X_SPEED_MODE, archive.stats.mode.to_string()),
    ];
    Ok((StatusCode::OK, headers, archive.bytes).into_response())
}

/// `OPTIONS` on both capture routes. The CORS headers come from the router layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// `GET /health`
pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "configured": state.config.is_configured(),
    }))
}
