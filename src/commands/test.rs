use anyhow::Result;
use colored::Colorize;
use productinfo::config::{self, SourceConfig};
use std::path::Path;

/// Execute the test command
///
/// This validates the configuration file without starting the renewal loop
pub fn execute(config_path: &Path) -> Result<()> {
    println!("{}", "Testing configuration...".yellow());

    // Load configuration (this will validate it)
    let cfg = config::load_config(config_path)?;

    println!("{}", "✓ Configuration test successful".green());
    println!();

    println!("{}", "Configuration Summary:".bold());
    println!("  {}: {}", "Log Level".cyan(), cfg.log.level);
    println!("  {}: {}", "Log Format".cyan(), cfg.log.format);
    println!(
        "  {}: every {}s, ttl {}",
        "Renewal".cyan(),
        cfg.renewal.interval_seconds,
        if cfg.renewal.cache_ttl_seconds == 0 {
            "never".to_string()
        } else {
            format!("{}s", cfg.renewal.cache_ttl_seconds)
        }
    );
    println!("  {}: {}", "Cache Namespace".cyan(), cfg.cache.namespace);
    println!();

    println!("{}", "Providers:".cyan());
    match &cfg.providers.azure {
        Some(azure) => {
            let source = match &azure.source {
                SourceConfig::File { path } => format!("file {}", path),
                SourceConfig::Url { url, .. } => format!("url {}", url),
            };
            println!(
                "    Azure: {} ({})",
                if azure.enabled {
                    "enabled".green()
                } else {
                    "disabled".red()
                },
                source
            );
        }
        None => println!("    Azure: {}", "not configured".dimmed()),
    }
    println!();

    println!("  {}: {}", "Metrics".cyan(), if cfg.metrics.enabled {
        "enabled".green()
    } else {
        "disabled".red()
    });
    if cfg.metrics.enabled {
        println!("    Listen: {}", cfg.metrics.listen_address);
    }

    Ok(())
}
