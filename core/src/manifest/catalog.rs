use crate::dependencies::types::Factory;
use std::collections::HashMap;

/// **FACTORY CATALOG**
///
/// Maps the factory references used in a [`Manifest`](super::Manifest) to
/// [`Factory`] values. One factory may back several entries.
#[derive(Debug, Clone, Default)]
pub struct FactoryCatalog {
    factories: HashMap<String, Factory>,
}

impl FactoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a factory, returning the previous one.
    pub fn insert(&mut self, reference: impl Into<String>, factory: Factory) -> Option<Factory> {
        let reference = reference.into();
        log::trace!("Catalog factory '{}'", reference);
        self.factories.insert(reference, factory)
    }

    /// Builder form of [`FactoryCatalog::insert`].
    pub fn with(mut self, reference: impl Into<String>, factory: Factory) -> Self {
        self.insert(reference, factory);
        self
    }

    pub fn get(&self, reference: &str) -> Option<&Factory> {
        self.factories.get(reference)
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.factories.contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Factory references, sorted.
    pub fn references(&self) -> Vec<&str> {
        let mut references: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        references.sort_unstable();
        references
    }
}
