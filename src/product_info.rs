use crate::error::{ProductInfoError, Result};
use crate::product::{Price, PriceTable, ProductDetails, VmShape, CPU, MEMORY};
use crate::provider_trait::{NetworkPerfMapper, ProductInfoer};
use crate::registry::ProviderRegistry;
use crate::store::{CacheKeys, CacheValue, ProductStorer};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Read side of the product info subsystem.
///
/// Answers from the product store populated by the renewal manager. Only
/// providers with short-lived price info are ever asked directly.
pub struct CachingProductInfo {
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn ProductStorer>,
    keys: CacheKeys,
}

impl CachingProductInfo {
    pub fn new(registry: Arc<ProviderRegistry>, store: Arc<dyn ProductStorer>, keys: CacheKeys) -> Self {
        Self {
            registry,
            store,
            keys,
        }
    }

    pub fn get_providers(&self) -> Vec<String> {
        self.registry.provider_names()
    }

    pub fn get_attributes(&self) -> Vec<&'static str> {
        vec![CPU, MEMORY]
    }

    /// Possible values of `attribute` on `provider`, ascending
    pub fn get_attr_values(&self, provider: &str, attribute: &str) -> Result<Vec<f64>> {
        self.infoer(provider)?;
        if !self.get_attributes().contains(&attribute) {
            return Err(ProductInfoError::UnsupportedOperation(format!(
                "unsupported attribute: {}",
                attribute
            )));
        }

        match self.cached(&self.keys.attr_values(provider, attribute))? {
            CacheValue::AttrValues(values) => {
                let mut floats: Vec<f64> = values.iter().map(|v| v.value).collect();
                floats.sort_by(f64::total_cmp);
                Ok(floats)
            }
            other => Err(unexpected(&other)),
        }
    }

    pub fn get_zones(&self, provider: &str, region: &str) -> Result<Vec<String>> {
        self.infoer(provider)?;
        match self.cached(&self.keys.zones(provider, region))? {
            CacheValue::Zones(zones) => Ok(zones),
            other => Err(unexpected(&other)),
        }
    }

    pub fn get_regions(&self, provider: &str) -> Result<HashMap<String, String>> {
        self.infoer(provider)?;
        match self.cached(&self.keys.regions(provider))? {
            CacheValue::Regions(regions) => Ok(regions),
            other => Err(unexpected(&other)),
        }
    }

    pub fn get_vms(&self, provider: &str, region: &str) -> Result<Vec<VmShape>> {
        self.infoer(provider)?;
        match self.cached(&self.keys.vms(provider, region))? {
            CacheValue::Vms(vms) => Ok(vms),
            other => Err(unexpected(&other)),
        }
    }

    pub fn has_short_lived_price_info(&self, provider: &str) -> Result<bool> {
        Ok(self.infoer(provider)?.has_short_lived_price_info())
    }

    /// Live prices of a region, bypassing the cache
    pub async fn get_current_prices(&self, provider: &str, region: &str) -> Result<HashMap<String, Price>> {
        let infoer = self.infoer(provider)?;
        if !infoer.has_short_lived_price_info() {
            return Err(ProductInfoError::UnsupportedOperation(format!(
                "{} prices cannot be queried on the fly",
                provider
            )));
        }
        infoer.get_current_prices(region).await
    }

    /// On-demand price and the spot price averaged over `zones`.
    ///
    /// Zones without spot data are left out of the average; with no spot data
    /// at all the spot price is 0.
    pub async fn get_price(
        &self,
        provider: &str,
        region: &str,
        instance_type: &str,
        zones: &[String],
    ) -> Result<(f64, f64)> {
        let infoer = self.infoer(provider)?;
        let key = self.keys.price(provider, region, instance_type);

        let price = match self.store.get(&key) {
            Some(CacheValue::Price(price)) => price,
            Some(other) => return Err(unexpected(&other)),
            None if infoer.has_short_lived_price_info() => {
                debug!(provider, region, instance_type, "price not cached, querying current prices");
                infoer
                    .get_current_prices(region)
                    .await?
                    .remove(instance_type)
                    .ok_or_else(|| ProductInfoError::NotFound(key.clone()))?
            }
            None => return Err(ProductInfoError::NotFound(key)),
        };

        Ok((price.on_demand_price, price.average_spot(zones)))
    }

    /// Run the provider's bulk price download directly
    pub async fn initialize(&self, provider: &str) -> Result<PriceTable> {
        let infoer = self.infoer(provider)?;
        infoer.refresh().await?;
        infoer.initialize().await
    }

    pub fn get_network_perf_mapper(&self, provider: &str) -> Result<Arc<dyn NetworkPerfMapper>> {
        self.infoer(provider)?.network_performance_mapper()
    }

    /// Cached vm shapes of a region joined with their cached prices
    pub fn get_product_details(&self, provider: &str, region: &str) -> Result<Vec<ProductDetails>> {
        let vms = self.get_vms(provider, region)?;

        Ok(vms
            .into_iter()
            .map(|vm| {
                let price = match self.store.get(&self.keys.price(provider, region, &vm.instance_type)) {
                    Some(CacheValue::Price(price)) => Some(price),
                    _ => None,
                };
                ProductDetails::new(vm, price.as_ref())
            })
            .collect())
    }

    fn infoer(&self, provider: &str) -> Result<&Arc<dyn ProductInfoer>> {
        self.registry
            .get(provider)
            .ok_or_else(|| ProductInfoError::NotFound(format!("provider {}", provider)))
    }

    fn cached(&self, key: &str) -> Result<CacheValue> {
        self.store
            .get(key)
            .ok_or_else(|| ProductInfoError::NotFound(key.to_string()))
    }
}

fn unexpected(value: &CacheValue) -> ProductInfoError {
    ProductInfoError::NotFound(format!("unexpected cache value: {:?}", value))
}
