use crate::provider_trait::ProductInfoer;
use std::collections::HashMap;
use std::sync::Arc;

/// Central registry mapping provider names to their [`ProductInfoer`].
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ProductInfoer>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, infoer: Arc<dyn ProductInfoer>) {
        self.providers.insert(name.into(), infoer);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ProductInfoer>> {
        self.providers.get(name)
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Provider names, sorted
    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
