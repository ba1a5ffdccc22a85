use anyhow::{Context, Result};
use colored::Colorize;
use productinfo::renewal::RenewalManager;
use productinfo::store::{CacheKeys, MemoryStore};
use productinfo::{config, init_tracing, metrics, providers, signals};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Execute the start command
///
/// This will:
/// 1. Load configuration and initialize tracing
/// 2. Install the Prometheus exporter if enabled
/// 3. Build the provider registry
/// 4. Run the renewal loop until SIGINT/SIGTERM
pub async fn execute(config_path: &Path) -> Result<()> {
    println!("{}", "Starting product info renewal...".green());

    let cfg = config::load_config(config_path)?;
    init_tracing(&cfg.log.level, &cfg.log.format);

    if cfg.metrics.enabled {
        let addr: SocketAddr = cfg
            .metrics
            .listen_address
            .parse()
            .with_context(|| format!("Invalid metrics listen address: {}", cfg.metrics.listen_address))?;
        metrics::init_metrics(addr)?;
        info!("Metrics exporter listening on {}", addr);
    }

    let registry = Arc::new(providers::build_registry(&cfg)?);
    let store = Arc::new(MemoryStore::new());
    let manager = Arc::new(RenewalManager::new(
        registry,
        store,
        CacheKeys::new(&cfg.cache.namespace),
        &cfg.renewal,
    ));

    let (shutdown_tx, signal_handle) = signals::setup_signal_handlers()?;
    manager.run(shutdown_tx.subscribe()).await;
    signal_handle.abort();

    info!("Product info renewal stopped");
    Ok(())
}
