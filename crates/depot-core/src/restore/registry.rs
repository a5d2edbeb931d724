use std::{collections::HashMap, sync::Arc};

use super::{
    apt::AptRestoreBlobStrategy, maven::MavenRestoreBlobStrategy, npm::NpmRestoreBlobStrategy,
    raw::RawRestoreBlobStrategy, RestoreBlobStrategy,
};

/// Restore strategies keyed on repository format.
#[derive(Clone, Default)]
pub struct RestoreStrategyRegistry {
    strategies: HashMap<&'static str, Arc<dyn RestoreBlobStrategy>>,
}

impl RestoreStrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in format. `packaging_extensions` maps maven packaging
    /// types to the file extension of their main artifact.
    pub fn with_defaults(packaging_extensions: HashMap<String, String>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(RawRestoreBlobStrategy));
        registry.register(Arc::new(MavenRestoreBlobStrategy::new(packaging_extensions)));
        registry.register(Arc::new(NpmRestoreBlobStrategy));
        registry.register(Arc::new(AptRestoreBlobStrategy));
        registry
    }

    /// Adds a strategy, replacing any previous one for the same format.
    pub fn register(&mut self, strategy: Arc<dyn RestoreBlobStrategy>) {
        self.strategies.insert(strategy.format(), strategy);
    }

    pub fn get(&self, format: &str) -> Option<Arc<dyn RestoreBlobStrategy>> {
        self.strategies.get(format).cloned()
    }

    pub fn formats(&self) -> Vec<&'static str> {
        let mut formats: Vec<_> = self.strategies.keys().copied().collect();
        formats.sort_unstable();
        formats
    }
}
