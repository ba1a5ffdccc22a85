//! Shared TTL cache holding everything the renewal cycles produce.

use crate::product::{AttrValue, Price, VmShape};
use dashmap::DashMap;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default key namespace
pub const DEFAULT_NAMESPACE: &str = "banzaicloud.com/recommender";

/// Values kept in the product store
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Vms(Vec<VmShape>),
    AttrValues(Vec<AttrValue>),
    Price(Price),
    Zones(Vec<String>),
    Regions(HashMap<String, String>),
}

/// Cache operations needed by the product info subsystem.
///
/// Implementations must be safe for concurrent readers and writers.
pub trait ProductStorer: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheValue>;

    /// Store `value` under `key`, replacing any previous value. A zero `ttl`
    /// never expires.
    fn set(&self, key: &str, value: CacheValue, ttl: Duration);

    /// Drop expired entries, returning how many were removed
    fn purge_expired(&self) -> usize;
}

struct CacheEntry {
    value: CacheValue,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-memory [`ProductStorer`]
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired ones included until purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProductStorer for MemoryStore {
    fn get(&self, key: &str) -> Option<CacheValue> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    fn set(&self, key: &str, value: CacheValue, ttl: Duration) {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }
}

/// Cache key templates.
///
/// Clients may read the cache directly, so the key shapes must not change.
#[derive(Debug, Clone)]
pub struct CacheKeys {
    namespace: String,
}

impl CacheKeys {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.trim_matches('/').to_string(),
        }
    }

    pub fn vms(&self, vendor: &str, region: &str) -> String {
        format!("/{}/{}/{}/vms", self.namespace, vendor, region)
    }

    pub fn attr_values(&self, vendor: &str, attribute: &str) -> String {
        format!("/{}/{}/attrValues/{}", self.namespace, vendor, attribute)
    }

    pub fn price(&self, vendor: &str, region: &str, instance_type: &str) -> String {
        format!("/{}/{}/{}/prices/{}", self.namespace, vendor, region, instance_type)
    }

    pub fn zones(&self, vendor: &str, region: &str) -> String {
        format!("/{}/{}/{}/zones/", self.namespace, vendor, region)
    }

    pub fn regions(&self, vendor: &str) -> String {
        format!("/{}/{}/regions/", self.namespace, vendor)
    }
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}
