use crate::error::{ProductInfoError, Result};
use crate::ingest::PriceIngestor;
use crate::machine_type::{MachineTypeNormalizer, MachineTypeRules};
use crate::product::{
    dedup_attr_values, AttrValue, NetworkPerfCategory, Price, PriceTable, VmShape, CPU, MEMORY,
};
use crate::provider_trait::{LabelPerfMapper, NetworkPerfMapper, ProductInfoer};
use crate::providers::rate_card::{AzureCatalog, RateCardSource, VmSize};
use crate::region::{RegionCodeTable, RegionResolver};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub const PROVIDER_NAME: &str = "azure";

/// Azure product info backed by a [`RateCardSource`].
///
/// The catalog is downloaded once per renewal by [`ProductInfoer::refresh`];
/// every other call reads that snapshot.
pub struct AzureInfoer {
    source: Arc<dyn RateCardSource>,
    catalog: RwLock<Option<Arc<AzureCatalog>>>,
    ingestor: PriceIngestor,
    network_mapper: Arc<dyn NetworkPerfMapper>,
}

impl AzureInfoer {
    pub fn new(source: Arc<dyn RateCardSource>) -> Result<Self> {
        let ingestor = PriceIngestor::new(
            PROVIDER_NAME,
            RegionResolver::new(RegionCodeTable::azure()),
            MachineTypeNormalizer::new(MachineTypeRules::azure()?),
        );
        Ok(Self::with_ingestor(source, ingestor))
    }

    pub fn with_ingestor(source: Arc<dyn RateCardSource>, ingestor: PriceIngestor) -> Self {
        Self {
            source,
            catalog: RwLock::new(None),
            ingestor,
            network_mapper: Arc::new(azure_network_mapper()),
        }
    }

    /// Current snapshot, loading one if none was fetched yet
    async fn catalog(&self) -> Result<Arc<AzureCatalog>> {
        if let Some(catalog) = self.catalog.read().await.as_ref() {
            return Ok(Arc::clone(catalog));
        }
        self.load_catalog().await
    }

    async fn load_catalog(&self) -> Result<Arc<AzureCatalog>> {
        let catalog = Arc::new(self.source.fetch().await?);
        debug!(
            "loaded Azure catalog: {} locations, {} meters",
            catalog.locations.len(),
            catalog.meters.len()
        );
        *self.catalog.write().await = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    fn to_shape(size: &VmSize) -> VmShape {
        VmShape {
            instance_type: size.name.clone(),
            cpus: f64::from(size.number_of_cores),
            memory_gib: size.memory_in_mb as f64 / 1024.0,
            ntw_perf: size.network_performance.clone(),
            ntw_perf_category: None,
            burst: size.name.starts_with("Standard_B"),
        }
    }
}

/// Azure network performance labels
pub fn azure_network_mapper() -> LabelPerfMapper {
    LabelPerfMapper::new([
        ("Low", NetworkPerfCategory::Low),
        ("Moderate", NetworkPerfCategory::Medium),
        ("High", NetworkPerfCategory::High),
        ("Very High", NetworkPerfCategory::Extra),
        ("Extremely High", NetworkPerfCategory::Extra),
    ])
}

#[async_trait]
impl ProductInfoer for AzureInfoer {
    async fn refresh(&self) -> Result<()> {
        self.load_catalog().await?;
        Ok(())
    }

    async fn initialize(&self) -> Result<PriceTable> {
        debug!("initializing Azure price info");
        let catalog = self.catalog().await?;
        let regions = catalog.regions();
        debug!("queried regions: {:?}", regions);

        let prices = self.ingestor.ingest(&catalog.meters, &regions);

        debug!("finished initializing Azure price info");
        Ok(prices)
    }

    async fn get_attribute_values(&self, attribute: &str) -> Result<Vec<AttrValue>> {
        debug!("getting {} values", attribute);
        if attribute != CPU && attribute != MEMORY {
            return Err(ProductInfoError::UnsupportedOperation(format!(
                "unknown attribute: {}",
                attribute
            )));
        }

        let catalog = self.catalog().await?;
        let mut values = Vec::new();
        for location in &catalog.locations {
            let Some(sizes) = catalog.vm_sizes.get(&location.name) else {
                warn!("[Azure] couldn't get VM sizes in region {}", location.name);
                continue;
            };
            values.extend(sizes.iter().map(|size| {
                if attribute == CPU {
                    AttrValue {
                        value: f64::from(size.number_of_cores),
                        str_value: size.number_of_cores.to_string(),
                    }
                } else {
                    AttrValue {
                        value: size.memory_in_mb as f64 / 1024.0,
                        str_value: size.memory_in_mb.to_string(),
                    }
                }
            }));
        }

        let values = dedup_attr_values(values);
        debug!("found {} values: {:?}", attribute, values);
        Ok(values)
    }

    async fn get_products(&self, region: &str) -> Result<Vec<VmShape>> {
        debug!("getting product info [region={}]", region);
        let catalog = self.catalog().await?;
        let vms: Vec<VmShape> = catalog
            .vm_sizes
            .get(region)
            .map(|sizes| sizes.iter().map(Self::to_shape).collect())
            .unwrap_or_default();

        debug!("found {} vms in {}", vms.len(), region);
        Ok(vms)
    }

    /// Azure prices are per region, so the region is its only zone
    async fn get_zones(&self, region: &str) -> Result<Vec<String>> {
        Ok(vec![region.to_string()])
    }

    async fn get_regions(&self) -> Result<HashMap<String, String>> {
        Ok(self.catalog().await?.regions())
    }

    fn has_short_lived_price_info(&self) -> bool {
        false
    }

    async fn get_current_prices(&self, _region: &str) -> Result<HashMap<String, Price>> {
        Err(ProductInfoError::UnsupportedOperation(
            "azure prices cannot be queried on the fly".to_string(),
        ))
    }

    fn memory_attr_name(&self) -> &str {
        MEMORY
    }

    fn cpu_attr_name(&self) -> &str {
        CPU
    }

    fn network_performance_mapper(&self) -> Result<Arc<dyn NetworkPerfMapper>> {
        Ok(self.network_mapper.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{MeterRecord, COMPUTE_CATEGORY};
    use crate::providers::rate_card::{AzureCatalog, Location};

    struct StaticSource(AzureCatalog);

    #[async_trait]
    impl RateCardSource for StaticSource {
        async fn fetch(&self) -> Result<AzureCatalog> {
            Ok(self.0.clone())
        }
    }

    fn size(name: &str, cores: u32, mb: u64, ntw: &str) -> VmSize {
        VmSize {
            name: name.to_string(),
            number_of_cores: cores,
            memory_in_mb: mb,
            network_performance: ntw.to_string(),
        }
    }

    fn catalog() -> AzureCatalog {
        let mut vm_sizes = HashMap::new();
        vm_sizes.insert(
            "eastus".to_string(),
            vec![
                size("Standard_D2", 2, 7168, "Moderate"),
                size("Standard_B2s", 2, 4096, "Low"),
            ],
        );
        vm_sizes.insert(
            "westeurope".to_string(),
            vec![size("Standard_D4", 4, 14336, "High"), size("Standard_D2", 2, 7168, "Moderate")],
        );

        AzureCatalog {
            locations: vec![
                Location { name: "eastus".into(), display_name: "East US".into() },
                Location { name: "westeurope".into(), display_name: "West Europe".into() },
                Location { name: "brazilsouth".into(), display_name: "Brazil South".into() },
            ],
            meters: vec![MeterRecord {
                meter_category: COMPUTE_CATEGORY.to_string(),
                meter_sub_category: "Standard_D2 VM".to_string(),
                meter_region: "US East".to_string(),
                meter_tags: Vec::new(),
                meter_rates: [("0".to_string(), 0.1)].into_iter().collect(),
            }],
            vm_sizes,
        }
    }

    fn infoer() -> AzureInfoer {
        AzureInfoer::new(Arc::new(StaticSource(catalog()))).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_ingests_meters() {
        let prices = infoer().initialize().await.unwrap();
        assert_eq!(prices["eastus"]["Standard_D2"].on_demand_price, 0.1);
        assert_eq!(prices["eastus"]["Standard_DS2-4"].on_demand_price, 0.1);
    }

    #[tokio::test]
    async fn test_attribute_values_are_deduplicated() {
        let azure = infoer();

        let mut cpus: Vec<f64> = azure
            .get_attribute_values(CPU)
            .await
            .unwrap()
            .iter()
            .map(|v| v.value)
            .collect();
        cpus.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(cpus, vec![2.0, 4.0]);

        let memory = azure.get_attribute_values(MEMORY).await.unwrap();
        assert_eq!(memory.len(), 3);
        assert!(memory.iter().any(|v| v.value == 7.0 && v.str_value == "7168"));
    }

    #[tokio::test]
    async fn test_unknown_attribute() {
        let err = infoer().get_attribute_values("gpu").await.unwrap_err();
        assert!(matches!(err, ProductInfoError::UnsupportedOperation(_)));
    }

    #[tokio::test]
    async fn test_products_and_zones() {
        let azure = infoer();
        let vms = azure.get_products("eastus").await.unwrap();
        assert_eq!(vms.len(), 2);
        assert_eq!(vms[0].memory_gib, 7.0);
        assert!(!vms[0].burst);
        assert!(vms[1].burst);

        assert!(azure.get_products("brazilsouth").await.unwrap().is_empty());
        assert_eq!(azure.get_zones("eastus").await.unwrap(), vec!["eastus"]);
    }

    #[tokio::test]
    async fn test_current_prices_unsupported() {
        let azure = infoer();
        assert!(!azure.has_short_lived_price_info());
        let err = azure.get_current_prices("eastus").await.unwrap_err();
        assert!(matches!(err, ProductInfoError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_network_mapper() {
        let mapper = azure_network_mapper();
        let mut vm = VmShape::new("Standard_D2", 2.0, 7.0);
        vm.ntw_perf = "Moderate".to_string();
        assert_eq!(mapper.map_network_perf(&vm).unwrap(), NetworkPerfCategory::Medium);
        vm.ntw_perf = "Extremely High".to_string();
        assert_eq!(mapper.map_network_perf(&vm).unwrap(), NetworkPerfCategory::Extra);
    }
}
