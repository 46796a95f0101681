//! Web layer for the image warehouse.
//!
//! Thin axum handlers over the cache, decoder, and resampler. Everything
//! a handler touches lives in [`AppState`]; the process keeps no global
//! mutable state, so tests can run several servers side by side.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{Router, routing::get};
use chrono::{DateTime, Duration, Utc};
use tower_http::trace::TraceLayer;

use crate::{
    cache::ImageCache,
    config::Config,
    errors::{AppError, AppResult},
    metrics::ServerMetrics,
    resize::Resampler,
    warehouse::Decoder,
};

pub mod handlers;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ImageCache>,
    pub decoder: Arc<dyn Decoder>,
    pub resampler: Arc<Resampler>,
    pub metrics: Arc<ServerMetrics>,
    /// Cache headers are stamped once at startup; the warehouse is
    /// treated as immutable for the life of the process.
    pub last_modified: String,
    pub expires: String,
}

impl AppState {
    pub fn new(
        cache: Arc<ImageCache>,
        decoder: Arc<dyn Decoder>,
        resampler: Arc<Resampler>,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        let now = Utc::now();
        Self {
            cache,
            decoder,
            resampler,
            metrics,
            last_modified: http_date(now),
            expires: http_date(now + Duration::days(30)),
        }
    }
}

/// RFC 7231 IMF-fixdate.
fn http_date(t: DateTime<Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(handlers::status))
        .route("/health", get(handlers::health))
        .route("/{*filename}", get(handlers::serve_image))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Web server configuration and setup.
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &Config, state: AppState) -> AppResult<Self> {
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port)
            .parse()
            .map_err(|err| AppError::Configuration {
                message: format!("invalid listen address: {err}"),
            })?;
        Ok(Self {
            app: router(state),
            addr,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bind and serve until the process is stopped.
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!(addr = %self.addr, "image warehouse listening");
        axum::serve(listener, self.app).await?;
        Ok(())
    }
}
