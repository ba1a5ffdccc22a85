pub mod azure;
pub mod rate_card;

use crate::config::{Config, SourceConfig};
use crate::error::Result;
use crate::registry::ProviderRegistry;
use rate_card::{FileSource, HttpSource, RateCardSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use azure::AzureInfoer;

/// Build the provider registry from the enabled providers in `config`
pub fn build_registry(config: &Config) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    if let Some(azure) = config.providers.azure.as_ref().filter(|a| a.enabled) {
        let source = build_source(&azure.source)?;
        registry.register(azure::PROVIDER_NAME, Arc::new(AzureInfoer::new(source)?));
        info!("Registered provider: {}", azure::PROVIDER_NAME);
    }

    Ok(registry)
}

fn build_source(source: &SourceConfig) -> Result<Arc<dyn RateCardSource>> {
    Ok(match source {
        SourceConfig::File { path } => Arc::new(FileSource::new(path)),
        SourceConfig::Url {
            url,
            timeout_seconds,
        } => Arc::new(HttpSource::new(url, Duration::from_secs(*timeout_seconds))?),
    })
}
