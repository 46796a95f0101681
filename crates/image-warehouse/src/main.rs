use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_warehouse::{
    cache::{self, ImageCache},
    config::Config,
    metrics::ServerMetrics,
    resize::Resampler,
    warehouse::WarehouseDecoder,
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "image-warehouse")]
#[command(version)]
#[command(about = "HTTP image service with in-memory caching and Lanczos resizing")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Warehouse directory (overrides config file)
    #[arg(short, long, value_name = "DIR")]
    warehouse: Option<std::path::PathBuf>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Skip the warm-up scan of the warehouse directory
    #[arg(long)]
    no_warm_cache: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("image_warehouse={},tower_http={}", cli.log_level, cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting image warehouse v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(warehouse) = cli.warehouse {
        config.warehouse.path = warehouse;
    }
    if cli.no_warm_cache {
        config.warehouse.warm_cache = false;
    }

    info!(
        warehouse = %config.warehouse.path.display(),
        cache_capacity = config.cache.capacity,
        resize_workers = config.resize.workers,
        "configuration loaded"
    );

    let cache = Arc::new(ImageCache::new(config.cache.capacity)?);
    let decoder = Arc::new(WarehouseDecoder::new(&config.warehouse.path));
    let resampler = Arc::new(Resampler::new(config.resize.workers));
    let metrics = Arc::new(ServerMetrics::new());

    if config.warehouse.warm_cache {
        let cache = Arc::clone(&cache);
        let decoder = Arc::clone(&decoder);
        let dir = config.warehouse.path.clone();
        let warmed = tokio::task::spawn_blocking(move || {
            cache::build(cache.as_ref(), decoder.as_ref(), &dir)
        })
        .await?;
        match warmed {
            Ok(stats) => info!(loaded = stats.loaded, scanned = stats.scanned, "cache warmed"),
            Err(err) => warn!(%err, "cache warm-up failed, continuing with a cold cache"),
        }
    }

    let state = AppState::new(cache, decoder, resampler, metrics);
    let server = WebServer::new(&config, state)?;
    server.serve().await
}
