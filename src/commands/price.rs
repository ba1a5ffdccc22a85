use anyhow::{bail, Result};
use colored::Colorize;
use productinfo::product_info::CachingProductInfo;
use productinfo::renewal::RenewalManager;
use productinfo::store::{CacheKeys, MemoryStore};
use productinfo::{config, init_tracing, providers};
use std::path::Path;
use std::sync::Arc;

/// Execute the price command
///
/// Runs a single renewal of `provider` into an in-memory store and prints the
/// on-demand and average spot price of `instance_type`.
pub async fn execute(
    config_path: &Path,
    provider: &str,
    region: &str,
    instance_type: &str,
    zones: &[String],
) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    init_tracing(&cfg.log.level, &cfg.log.format);

    let registry = Arc::new(providers::build_registry(&cfg)?);
    if !registry.has_provider(provider) {
        bail!(
            "Provider '{}' is not enabled (enabled: {:?})",
            provider,
            registry.provider_names()
        );
    }

    let store = Arc::new(MemoryStore::new());
    let keys = CacheKeys::new(&cfg.cache.namespace);
    let manager = RenewalManager::new(registry.clone(), store.clone(), keys.clone(), &cfg.renewal);

    println!("{}", format!("Renewing {} product info...", provider).yellow());
    manager.renew_now(provider).await?;

    let info = CachingProductInfo::new(registry, store, keys);
    let zones = if zones.is_empty() {
        info.get_zones(provider, region)?
    } else {
        zones.to_vec()
    };
    let (on_demand, spot) = info.get_price(provider, region, instance_type, &zones).await?;

    println!();
    println!("{}", format!("{} / {} / {}", provider, region, instance_type).bold());
    println!("  {}: {:.4}", "On-demand".cyan(), on_demand);
    println!("  {}: {:.4} (zones: {})", "Spot (avg)".cyan(), spot, zones.join(", "));

    Ok(())
}
