//! Periodic, per-provider refresh of the product store.
//!
//! Every provider renews in its own task. A renewal stages all of the
//! provider's keys first and writes them only once every fetch succeeded, so a
//! failing provider keeps serving its last good data. At most one renewal per
//! provider runs at any time; triggers arriving meanwhile are dropped.

use crate::config::RenewalConfig;
use crate::error::{ProductInfoError, Result};
use crate::metrics;
use crate::product::{CPU, MEMORY};
use crate::provider_trait::ProductInfoer;
use crate::registry::ProviderRegistry;
use crate::signals::ShutdownSignal;
use crate::store::{CacheKeys, CacheValue, ProductStorer};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalState {
    Idle,
    Refreshing,
    /// The renewal failed and is being logged; the provider returns to
    /// `Idle` with `last_error` set
    Failed,
}

#[derive(Debug, Clone)]
pub struct ProviderStatus {
    pub state: RenewalState,
    pub last_success: Option<DateTime<Utc>>,
    /// Error of the latest renewal, cleared by the next success
    pub last_error: Option<String>,
}

impl Default for ProviderStatus {
    fn default() -> Self {
        Self {
            state: RenewalState::Idle,
            last_success: None,
            last_error: None,
        }
    }
}

pub struct RenewalManager {
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn ProductStorer>,
    keys: CacheKeys,
    interval: Duration,
    ttl: Duration,
    shutdown_grace: Duration,
    in_flight: HashMap<String, Arc<Mutex<()>>>,
    status: DashMap<String, ProviderStatus>,
}

impl RenewalManager {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        store: Arc<dyn ProductStorer>,
        keys: CacheKeys,
        config: &RenewalConfig,
    ) -> Self {
        let in_flight = registry
            .provider_names()
            .into_iter()
            .map(|name| (name, Arc::new(Mutex::new(()))))
            .collect();

        Self {
            registry,
            store,
            keys,
            interval: config.interval(),
            ttl: config.cache_ttl(),
            shutdown_grace: config.shutdown_grace(),
            in_flight,
            status: DashMap::new(),
        }
    }

    pub fn status(&self, provider: &str) -> Option<ProviderStatus> {
        self.status.get(provider).map(|s| s.clone())
    }

    /// Renew `provider` on the current task.
    ///
    /// Returns `Ok(false)` without doing anything if a renewal of the provider
    /// is already in flight.
    pub async fn renew_now(&self, provider: &str) -> Result<bool> {
        let Some(guard) = self.try_acquire(provider)? else {
            return Ok(false);
        };
        self.renew_locked(provider, guard).await?;
        Ok(true)
    }

    /// Renew `provider` on a new task; `None` if one is already in flight.
    pub fn spawn_renewal(self: &Arc<Self>, provider: &str) -> Result<Option<JoinHandle<Result<()>>>> {
        let Some(guard) = self.try_acquire(provider)? else {
            return Ok(None);
        };
        let this = Arc::clone(self);
        let provider = provider.to_string();
        Ok(Some(tokio::spawn(async move {
            this.renew_locked(&provider, guard).await
        })))
    }

    /// Renew every provider each interval until a shutdown signal arrives.
    /// The first cycle starts immediately.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<ShutdownSignal>) {
        info!(
            "Starting product info renewal (interval: {:?}, providers: {:?})",
            self.interval,
            self.registry.provider_names()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.ttl.is_zero() {
                        let purged = self.store.purge_expired();
                        if purged > 0 {
                            debug!("Purged {} expired cache entries", purged);
                        }
                    }
                    for provider in self.registry.provider_names() {
                        let guard = match self.try_acquire(&provider) {
                            Ok(Some(guard)) => guard,
                            Ok(None) => continue,
                            Err(e) => {
                                error!("Failed to schedule renewal: {}", e);
                                continue;
                            }
                        };
                        let this = Arc::clone(&self);
                        tasks.spawn(async move { this.renew_locked(&provider, guard).await });
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => debug!("Renewal finished with error: {}", e),
                    Err(e) => error!("Renewal task failed: {}", e),
                },
                _ = shutdown.recv() => {
                    info!("Shutdown signal received, stopping renewal loop");
                    break;
                }
            }
        }

        if tasks.is_empty() {
            return;
        }
        info!("Waiting for {} in-flight renewal(s)", tasks.len());
        let drained = tokio::time::timeout(self.shutdown_grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                "In-flight renewals did not finish within {:?}, abandoning them",
                self.shutdown_grace
            );
            tasks.abort_all();
        }
    }

    fn try_acquire(&self, provider: &str) -> Result<Option<OwnedMutexGuard<()>>> {
        let lock = self
            .in_flight
            .get(provider)
            .ok_or_else(|| ProductInfoError::NotFound(format!("provider {}", provider)))?;

        match Arc::clone(lock).try_lock_owned() {
            Ok(guard) => Ok(Some(guard)),
            Err(_) => {
                info!(provider, "Renewal already in flight, skipping trigger");
                metrics::record_renewal_skipped(provider);
                Ok(None)
            }
        }
    }

    async fn renew_locked(&self, provider: &str, _guard: OwnedMutexGuard<()>) -> Result<()> {
        let infoer = self
            .registry
            .get(provider)
            .ok_or_else(|| ProductInfoError::NotFound(format!("provider {}", provider)))?;

        self.status.entry(provider.to_string()).or_default().state = RenewalState::Refreshing;
        info!(provider, "Renewing product info");
        let started = Instant::now();

        match self.fetch(provider, infoer.as_ref()).await {
            Ok(entries) => {
                let count = entries.len();
                for (key, value) in entries {
                    self.store.set(&key, value, self.ttl);
                }

                let mut status = self.status.entry(provider.to_string()).or_default();
                status.state = RenewalState::Idle;
                status.last_success = Some(Utc::now());
                status.last_error = None;
                drop(status);

                metrics::record_renewal(provider, "success", started.elapsed());
                info!(provider, entries = count, "Product info renewed");
                Ok(())
            }
            Err(e) => {
                self.status.entry(provider.to_string()).or_default().state = RenewalState::Failed;
                metrics::record_renewal(provider, "failure", started.elapsed());
                error!(provider, "Product info renewal failed: {}", e);

                let mut status = self.status.entry(provider.to_string()).or_default();
                status.state = RenewalState::Idle;
                status.last_error = Some(e.to_string());
                drop(status);
                Err(e)
            }
        }
    }

    /// Collect every key/value of one renewal without touching the store
    async fn fetch(&self, provider: &str, infoer: &dyn ProductInfoer) -> Result<Vec<(String, CacheValue)>> {
        let wrap = |e: ProductInfoError| ProductInfoError::vendor_fetch(provider, e);
        let mut entries = Vec::new();

        infoer.refresh().await.map_err(wrap)?;

        for (attribute, native) in [(CPU, infoer.cpu_attr_name()), (MEMORY, infoer.memory_attr_name())] {
            let values = infoer.get_attribute_values(native).await.map_err(wrap)?;
            debug!(provider, attribute, count = values.len(), "attribute values fetched");
            entries.push((
                self.keys.attr_values(provider, attribute),
                CacheValue::AttrValues(values),
            ));
        }

        let regions = infoer.get_regions().await.map_err(wrap)?;
        let mut region_ids: Vec<String> = regions.keys().cloned().collect();
        region_ids.sort();
        entries.push((self.keys.regions(provider), CacheValue::Regions(regions)));

        let mapper = infoer.network_performance_mapper().map_err(wrap)?;
        let per_region = futures::future::try_join_all(region_ids.iter().map(|region| {
            let mapper = Arc::clone(&mapper);
            async move {
                let zones = infoer.get_zones(region).await?;
                let mut vms = infoer.get_products(region).await?;
                for vm in &mut vms {
                    match mapper.map_network_perf(vm) {
                        Ok(category) => vm.ntw_perf_category = Some(category),
                        Err(e) => debug!(provider, region = %region, "{}", e),
                    }
                }
                Ok::<_, ProductInfoError>((region, zones, vms))
            }
        }))
        .await
        .map_err(wrap)?;

        for (region, zones, vms) in per_region {
            entries.push((self.keys.zones(provider, region), CacheValue::Zones(zones)));
            entries.push((self.keys.vms(provider, region), CacheValue::Vms(vms)));
        }

        let prices = infoer.initialize().await.map_err(wrap)?;
        for (region, types) in prices {
            for (instance_type, price) in types {
                entries.push((
                    self.keys.price(provider, &region, &instance_type),
                    CacheValue::Price(price),
                ));
            }
        }

        Ok(entries)
    }
}
