use crate::error::{ProductInfoError, Result};
use crate::product::{AttrValue, NetworkPerfCategory, Price, PriceTable, VmShape};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Vendor specific access to instance type and pricing information.
///
/// Each cloud vendor implements this once; the renewal manager and the
/// query side only ever talk to vendors through it.
#[async_trait]
pub trait ProductInfoer: Send + Sync + 'static {
    /// Called first in every renewal. Vendors serving from a downloaded
    /// snapshot reload it here so the rest of the renewal reads one snapshot.
    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    /// Called once per renewal, so it can download a large price descriptor
    async fn initialize(&self) -> Result<PriceTable>;

    /// Possible values of a vendor native attribute (see [`Self::cpu_attr_name`])
    async fn get_attribute_values(&self, attribute: &str) -> Result<Vec<AttrValue>>;

    /// Vm shapes available in a region
    async fn get_products(&self, region: &str) -> Result<Vec<VmShape>>;

    /// Availability zones of a region
    async fn get_zones(&self, region: &str) -> Result<Vec<String>>;

    /// Region id -> display name
    async fn get_regions(&self) -> Result<HashMap<String, String>>;

    /// Whether prices change too often to be served from the renewal cache
    fn has_short_lived_price_info(&self) -> bool;

    /// Live prices of a region, keyed by instance type
    async fn get_current_prices(&self, region: &str) -> Result<HashMap<String, Price>> {
        Err(ProductInfoError::UnsupportedOperation(format!(
            "prices in {} cannot be queried on the fly",
            region
        )))
    }

    fn memory_attr_name(&self) -> &str;

    fn cpu_attr_name(&self) -> &str;

    fn network_performance_mapper(&self) -> Result<Arc<dyn NetworkPerfMapper>>;
}

/// Maps vm shapes to network performance categories
pub trait NetworkPerfMapper: Send + Sync {
    fn map_network_perf(&self, vm: &VmShape) -> Result<NetworkPerfCategory>;
}

/// [`NetworkPerfMapper`] driven by the vendor's network performance labels
#[derive(Debug, Clone)]
pub struct LabelPerfMapper {
    labels: HashMap<String, NetworkPerfCategory>,
}

impl LabelPerfMapper {
    pub fn new<'a>(labels: impl IntoIterator<Item = (&'a str, NetworkPerfCategory)>) -> Self {
        Self {
            labels: labels
                .into_iter()
                .map(|(label, category)| (label.to_lowercase(), category))
                .collect(),
        }
    }
}

impl NetworkPerfMapper for LabelPerfMapper {
    fn map_network_perf(&self, vm: &VmShape) -> Result<NetworkPerfCategory> {
        self.labels
            .get(&vm.ntw_perf.trim().to_lowercase())
            .copied()
            .ok_or_else(|| {
                ProductInfoError::NotFound(format!(
                    "could not determine network performance for: [{}] {}",
                    vm.ntw_perf, vm.instance_type
                ))
            })
    }
}
