use anyhow::Result;
use colored::Colorize;
use productinfo::config;
use std::path::Path;

/// Execute the config show command
///
/// Displays the effective configuration, environment overrides included
pub fn show(config_path: &Path) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());

    let cfg = config::load_config(config_path)?;

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&cfg)?;
    println!("{}", toml_string);

    Ok(())
}
