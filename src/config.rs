use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::store::DEFAULT_NAMESPACE;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub renewal: RenewalConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// "text" or "json"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenewalConfig {
    pub interval_seconds: u64,
    /// 0 keeps entries until the next successful renewal overwrites them
    pub cache_ttl_seconds: u64,
    pub shutdown_grace_seconds: u64,
}

impl RenewalConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 86400,
            cache_ttl_seconds: 0,
            shutdown_grace_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: "0.0.0.0:9900".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
    pub azure: Option<AzureConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AzureConfig {
    pub enabled: bool,
    pub source: SourceConfig,
}

/// Where a provider's catalog snapshot comes from
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    File {
        path: String,
    },
    Url {
        url: String,
        #[serde(default = "default_timeout_seconds")]
        timeout_seconds: u64,
    },
}

fn default_timeout_seconds() -> u64 {
    60
}

impl ProvidersConfig {
    pub fn enabled_count(&self) -> usize {
        self.azure.iter().filter(|a| a.enabled).count()
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("PRODUCTINFO").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.providers.enabled_count() == 0 {
        anyhow::bail!("At least one provider must be enabled");
    }

    if cfg.renewal.interval_seconds == 0 {
        anyhow::bail!("Renewal interval must be greater than zero");
    }

    // entries must survive until the next cycle had a chance to replace them
    if cfg.renewal.cache_ttl_seconds != 0
        && cfg.renewal.cache_ttl_seconds < cfg.renewal.interval_seconds
    {
        anyhow::bail!(
            "Cache TTL ({}s) must not be shorter than the renewal interval ({}s)",
            cfg.renewal.cache_ttl_seconds,
            cfg.renewal.interval_seconds
        );
    }

    if cfg.cache.namespace.trim_matches('/').is_empty() {
        anyhow::bail!("Cache namespace cannot be empty");
    }

    match cfg.log.format.as_str() {
        "text" | "json" => {}
        other => anyhow::bail!("Invalid log format: {}", other),
    }

    if let Some(azure) = &cfg.providers.azure {
        match &azure.source {
            SourceConfig::File { path } if path.is_empty() => {
                anyhow::bail!("Azure source path cannot be empty")
            }
            SourceConfig::Url { url, .. } if url.is_empty() => {
                anyhow::bail!("Azure source url cannot be empty")
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validate_config_requires_enabled_provider() {
        let mut cfg = create_test_config();
        if let Some(azure) = cfg.providers.azure.as_mut() {
            azure.enabled = false;
        }

        let result = validate_config(&cfg);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("At least one provider must be enabled"));
    }

    #[test]
    fn test_validate_config_rejects_short_ttl() {
        let mut cfg = create_test_config();
        cfg.renewal.interval_seconds = 3600;
        cfg.renewal.cache_ttl_seconds = 60;

        let result = validate_config(&cfg);
        assert!(result.unwrap_err().to_string().contains("must not be shorter"));
    }

    #[test]
    fn test_validate_config_rejects_zero_interval() {
        let mut cfg = create_test_config();
        cfg.renewal.interval_seconds = 0;

        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_validate_config_accepts_defaults() {
        assert!(validate_config(&create_test_config()).is_ok());
    }

    #[test]
    fn test_load_config_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[renewal]
interval_seconds = 600
cache_ttl_seconds = 0
shutdown_grace_seconds = 5

[providers.azure]
enabled = true
source = {{ type = "url", url = "http://localhost/azure.json" }}
"#
        )
        .unwrap();

        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.renewal.interval_seconds, 600);
        assert_eq!(cfg.cache.namespace, DEFAULT_NAMESPACE);
        assert_eq!(cfg.log.level, "info");
        match &cfg.providers.azure.as_ref().unwrap().source {
            SourceConfig::Url { url, timeout_seconds } => {
                assert_eq!(url, "http://localhost/azure.json");
                assert_eq!(*timeout_seconds, 60);
            }
            other => panic!("Expected url source, got {:?}", other),
        }
    }

    fn create_test_config() -> Config {
        Config {
            providers: ProvidersConfig {
                azure: Some(AzureConfig {
                    enabled: true,
                    source: SourceConfig::File {
                        path: "azure.json".to_string(),
                    },
                }),
            },
            ..Config::default()
        }
    }
}
