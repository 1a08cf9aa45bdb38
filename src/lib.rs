//! Heatmark - heatmap annotation engine
//!
//! Paints gap-free brush strokes onto per-feature annotation rasters aligned
//! with a source image, and serves the datasets those images come from.

pub mod brush;
pub mod config;
pub mod dataset;
pub mod file;
pub mod input;
pub mod marker;
pub mod raster;
pub mod render;
pub mod server;

use config::ServerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heatmark=debug,heatmark_lib=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Heatmark initializing...");
}

/// Run the dataset service with configuration from the environment
pub async fn run() -> std::io::Result<()> {
    init();

    let config = ServerConfig::from_env();
    tracing::info!("Project root: {:?}", config.project_root);
    server::start(config).await
}
