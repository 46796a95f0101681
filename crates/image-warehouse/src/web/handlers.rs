//! HTTP request handlers.
//!
//! The image handler is the whole request path: cache lookup, decode on
//! miss, optional resize, JPEG encode. Decode, resize, and encode are all
//! CPU-bound, so they run under `spawn_blocking` to keep the runtime's
//! worker threads free.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tokio::task;
use tracing::{error, info, warn};

use crate::models::{Image, ImageHandle};

use super::AppState;

/// Target dimensions from the query string; zero (or absent) lets the
/// resampler derive the dimension from the aspect ratio.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ResizeParams {
    #[serde(default)]
    pub w: u32,
    #[serde(default)]
    pub h: u32,
}

/// `GET /{filename}?w=&h=` — serve a warehouse image as JPEG, resized
/// when either dimension is non-zero.
pub async fn serve_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(params): Query<ResizeParams>,
) -> Response {
    let started = Instant::now();

    let Some(image) = lookup(&state, &filename).await else {
        state.metrics.record_failure();
        return StatusCode::NOT_FOUND.into_response();
    };

    let image = if params.w != 0 || params.h != 0 {
        let resampler = Arc::clone(&state.resampler);
        let source = Arc::clone(&image);
        match task::spawn_blocking(move || resampler.resize(params.w, params.h, &source)).await {
            Ok(resized) => resized,
            Err(err) => {
                error!(%err, file = %filename, "resize task failed");
                state.metrics.record_failure();
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    } else {
        image
    };

    let body = match task::spawn_blocking(move || encode_jpeg(&image)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(err)) => {
            warn!(%err, file = %filename, "unable to encode image");
            state.metrics.record_failure();
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(err) => {
            error!(%err, file = %filename, "encode task failed");
            state.metrics.record_failure();
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    state.metrics.record_query();
    info!(
        file = %filename,
        w = params.w,
        h = params.h,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request served"
    );

    (
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (header::CACHE_CONTROL, "max-age=604800, public".to_string()),
            (header::LAST_MODIFIED, state.last_modified.clone()),
            (header::EXPIRES, state.expires.clone()),
        ],
        body,
    )
        .into_response()
}

/// Cache lookup with decode-on-miss. A decode failure is reported as a
/// plain miss; the caller renders it as 404.
async fn lookup(state: &AppState, filename: &str) -> Option<ImageHandle> {
    if let Some(image) = state.cache.get(filename) {
        return Some(image);
    }

    let decoder = Arc::clone(&state.decoder);
    let key = filename.to_string();
    let decoded = match task::spawn_blocking(move || decoder.decode(&key)).await {
        Ok(result) => result?,
        Err(err) => {
            error!(%err, file = %filename, "decode task failed");
            return None;
        }
    };

    let handle: ImageHandle = Arc::new(decoded);
    state.cache.put(filename, Arc::clone(&handle));
    Some(handle)
}

/// `GET /status` — request counters and cache statistics.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = state.metrics.snapshot();
    Json(json!({
        "queries": metrics.queries,
        "failed_queries": metrics.failed_queries,
        "started_at": metrics.started_at,
        "uptime_seconds": metrics.uptime_seconds,
        "cache": state.cache.stats(),
    }))
}

/// `GET /health` — liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Anything that matches no route counts as a failed query, like an
/// unservable image does.
pub async fn not_found(State(state): State<AppState>) -> StatusCode {
    state.metrics.record_failure();
    StatusCode::NOT_FOUND
}

fn encode_jpeg(image: &Image) -> Result<Vec<u8>, image::ImageError> {
    let rgb = image.to_rgb8();
    let mut bytes = Vec::new();
    rgb.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Jpeg)?;
    Ok(bytes)
}
