//! Event Collector - Main Entry Point

use api::{init_logging, run_server, CollectorConfig};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== Event Collector v{} ===", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = CollectorConfig::load(config_path.as_deref())?;

    run_server(config).await
}
