use crate::error::{ProductInfoError, Result};
use crate::ingest::MeterRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Azure location as listed for a subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub name: String,
    pub display_name: String,
}

/// Azure VM size as listed per location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmSize {
    pub name: String,
    pub number_of_cores: u32,
    #[serde(rename = "memoryInMB")]
    pub memory_in_mb: u64,
    #[serde(default)]
    pub network_performance: String,
}

/// Snapshot of everything the Azure adapter reads: subscription locations,
/// the rate card meters and the VM sizes of each location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureCatalog {
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub meters: Vec<MeterRecord>,
    #[serde(default)]
    pub vm_sizes: HashMap<String, Vec<VmSize>>,
}

impl AzureCatalog {
    pub fn regions(&self) -> HashMap<String, String> {
        self.locations
            .iter()
            .map(|l| (l.name.clone(), l.display_name.clone()))
            .collect()
    }
}

/// Supplies [`AzureCatalog`] snapshots
#[async_trait]
pub trait RateCardSource: Send + Sync {
    async fn fetch(&self) -> Result<AzureCatalog>;
}

/// Catalog read from a JSON file on disk
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RateCardSource for FileSource {
    async fn fetch(&self) -> Result<AzureCatalog> {
        debug!("Reading catalog from: {}", self.path.display());
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Catalog downloaded over HTTP
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProductInfoError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl RateCardSource for HttpSource {
    async fn fetch(&self) -> Result<AzureCatalog> {
        info!("Downloading catalog from: {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(ProductInfoError::vendor_fetch(
                "azure",
                format!("Failed to download catalog: HTTP {}", response.status()),
            ));
        }

        let content = response.text().await?;
        debug!("Downloaded {} bytes of catalog data", content.len());
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::Write;

    const CATALOG: &str = r#"{
        "locations": [{"name": "eastus", "displayName": "East US"}],
        "meters": [{
            "MeterCategory": "Virtual Machines",
            "MeterSubCategory": "A3 VM",
            "MeterRegion": "US East",
            "MeterTags": [],
            "MeterRates": {"0": 0.3}
        }],
        "vmSizes": {
            "eastus": [{"name": "Standard_A3", "numberOfCores": 4, "memoryInMB": 7168}]
        }
    }"#;

    #[tokio::test]
    async fn test_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();

        let catalog = FileSource::new(file.path()).fetch().await.unwrap();
        assert_eq!(catalog.locations.len(), 1);
        assert_eq!(catalog.meters.len(), 1);
        assert_eq!(catalog.vm_sizes["eastus"][0].memory_in_mb, 7168);
        assert_eq!(catalog.regions()["eastus"], "East US");
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let err = FileSource::new("/nonexistent/catalog.json").fetch().await.unwrap_err();
        assert!(matches!(err, ProductInfoError::Io(_)));
    }

    #[tokio::test]
    async fn test_http_source() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/azure.json");
                then.status(200).body(CATALOG);
            })
            .await;

        let source = HttpSource::new(&server.url("/azure.json"), Duration::from_secs(5)).unwrap();
        let catalog = source.fetch().await.unwrap();

        mock.assert_async().await;
        assert_eq!(catalog.meters[0].meter_sub_category, "A3 VM");
    }

    #[tokio::test]
    async fn test_http_source_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/azure.json");
                then.status(503);
            })
            .await;

        let source = HttpSource::new(&server.url("/azure.json"), Duration::from_secs(5)).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, ProductInfoError::VendorFetchFailure { .. }));
    }
}
