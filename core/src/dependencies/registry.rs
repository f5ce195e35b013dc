//! Name-keyed store of dependency declarations and their providers.

use crate::dependencies::types::{Dependency, Lifetime, Provider};
use crate::errors::ContainerError;
use crate::validation::{NameValidator, Validator};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A registered [`Dependency`] with the [`Provider`] that builds it.
#[derive(Debug)]
pub struct RegistryEntry {
    dependency: Dependency,
    provider: Provider,
}

impl RegistryEntry {
    pub fn name(&self) -> &str {
        self.dependency.name()
    }

    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn lifetime(&self) -> Lifetime {
        self.provider.lifetime()
    }
}

/// **REGISTRY**
///
/// Declarative map of names to (dependency, provider). References between
/// entries are plain names; they are checked when a graph is built, so
/// entries may be registered in any order.
#[derive(Debug)]
pub struct Registry {
    entries: HashMap<String, Arc<RegistryEntry>>,
    validator: NameValidator,
}

impl Registry {
    /// **CONSTRUCTOR** - same name rules as [`Container::new`](crate::Container::new)
    pub fn new() -> Self {
        Self::with_validator(NameValidator::standard())
    }

    pub fn with_validator(validator: NameValidator) -> Self {
        Self {
            entries: HashMap::new(),
            validator,
        }
    }

    /// **REGISTER**
    ///
    /// **ERRORS**: `InvalidName` for a malformed name or dependency name,
    /// `DuplicateName` when `name` is already present.
    pub fn register<I, S>(
        &mut self,
        name: &str,
        dependency_names: I,
        provider: Provider,
    ) -> Result<(), ContainerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.build_entry(name, dependency_names, provider)?;
        if self.entries.contains_key(name) {
            return Err(ContainerError::DuplicateName {
                name: name.to_string(),
            });
        }

        log::debug!(
            "Registered '{}' ({}) depending on {:?}",
            name,
            entry.lifetime(),
            entry.dependency.dependency_names()
        );
        self.entries.insert(name.to_string(), Arc::new(entry));
        Ok(())
    }

    /// **REPLACE** - register, overwriting an existing entry. Returns the old one.
    pub fn replace<I, S>(
        &mut self,
        name: &str,
        dependency_names: I,
        provider: Provider,
    ) -> Result<Option<Arc<RegistryEntry>>, ContainerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.build_entry(name, dependency_names, provider)?;
        let previous = self.entries.insert(name.to_string(), Arc::new(entry));
        log::debug!("Replaced '{}' (existed: {})", name, previous.is_some());
        Ok(previous)
    }

    /// **UNREGISTER**
    ///
    /// **ERRORS**: `NotFound` if absent, `InUse` while other entries still
    /// declare `name` as a dependency.
    pub fn unregister(&mut self, name: &str) -> Result<Arc<RegistryEntry>, ContainerError> {
        if !self.entries.contains_key(name) {
            return Err(ContainerError::NotFound {
                name: name.to_string(),
            });
        }

        let dependents = self.dependents_of(name);
        if !dependents.is_empty() {
            return Err(ContainerError::InUse {
                name: name.to_string(),
                dependents,
            });
        }

        log::debug!("Unregistered '{}'", name);
        self.entries
            .remove(name)
            .ok_or_else(|| ContainerError::NotFound {
                name: name.to_string(),
            })
    }

    /// **CASCADING UNREGISTER**
    ///
    /// Removes `name` and every entry that transitively depends on it.
    /// Returns the removed names, dependents before their dependencies.
    pub fn unregister_cascade(&mut self, name: &str) -> Result<Vec<String>, ContainerError> {
        if !self.entries.contains_key(name) {
            return Err(ContainerError::NotFound {
                name: name.to_string(),
            });
        }

        let mut removed = self.transitive_dependents(name);
        removed.push(name.to_string());
        for victim in &removed {
            self.entries.remove(victim);
        }

        log::debug!("Unregistered '{}' with dependents {:?}", name, removed);
        Ok(removed)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<RegistryEntry>> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of entries that directly declare `name` as a dependency, sorted.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        let mut dependents: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.name() != name && entry.dependency.depends_on(name))
            .map(|entry| entry.name().to_string())
            .collect();
        dependents.sort();
        dependents
    }

    /// Every entry that reaches `name` through its dependencies, ordered so
    /// that each dependent comes before anything it depends on.
    pub fn transitive_dependents(&self, name: &str) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(name.to_string());
        let mut ordered = Vec::new();
        self.collect_dependents(name, &mut seen, &mut ordered);
        ordered
    }

    // Post-order over the reverse edges: a dependent's own dependents land first.
    fn collect_dependents(&self, name: &str, seen: &mut HashSet<String>, out: &mut Vec<String>) {
        for dependent in self.dependents_of(name) {
            if seen.insert(dependent.clone()) {
                self.collect_dependents(&dependent, seen, out);
                out.push(dependent);
            }
        }
    }

    fn build_entry<I, S>(
        &self,
        name: &str,
        dependency_names: I,
        provider: Provider,
    ) -> Result<RegistryEntry, ContainerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validator.validate(name)?;
        let dependency = Dependency::new(name, dependency_names);
        for dep in dependency.dependency_names() {
            self.validator.validate(dep.as_str())?;
        }
        Ok(RegistryEntry {
            dependency,
            provider,
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Provider {
        Provider::transient(|_| Ok(()))
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register("config", Vec::<String>::new(), unit()).unwrap();
        registry.register("db", ["config"], unit()).unwrap();
        registry.register("repo", ["db"], unit()).unwrap();
        registry.register("service", ["repo", "config"], unit()).unwrap();
        registry
    }

    #[test]
    fn test_register_and_contains() {
        let registry = registry();
        assert!(registry.contains("db"));
        assert!(!registry.contains("cache"));
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.names(), vec!["config", "db", "repo", "service"]);
        assert_eq!(
            registry.get("service").unwrap().dependency().dependency_names(),
            &["repo".to_string(), "config".to_string()]
        );
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = registry();
        match registry.register("db", Vec::<String>::new(), unit()) {
            Err(ContainerError::DuplicateName { name }) => assert_eq!(name, "db"),
            other => panic!("Expected DuplicateName, got {:?}", other),
        }
    }

    #[test]
    fn test_replace_overwrites() {
        let mut registry = registry();
        let previous = registry
            .replace("db", Vec::<String>::new(), Provider::singleton(|_| Ok(1u8)))
            .unwrap();
        assert!(previous.is_some());
        assert_eq!(registry.get("db").unwrap().lifetime(), Lifetime::Singleton);
        assert!(registry.get("db").unwrap().dependency().dependency_names().is_empty());
    }

    #[test]
    fn test_invalid_names_rejected() {
        let mut registry = registry();
        assert!(matches!(
            registry.register("", Vec::<String>::new(), unit()),
            Err(ContainerError::InvalidName { .. })
        ));
        assert!(matches!(
            registry.register("ok", [""], unit()),
            Err(ContainerError::InvalidName { .. })
        ));

        let mut short = Registry::with_validator(NameValidator::new(3));
        assert!(short.register("abcd", Vec::<String>::new(), unit()).is_err());
    }

    #[test]
    fn test_new_registry_uses_container_name_rules() {
        let mut registry = Registry::new();
        for name in ["has space", "1st", "a/b"] {
            assert!(
                matches!(
                    registry.register(name, Vec::<String>::new(), unit()),
                    Err(ContainerError::InvalidName { .. })
                ),
                "{} should be rejected",
                name
            );
        }
        assert!(registry.register("app.db", ["cache:redis"], unit()).is_ok());

        let mut relaxed = Registry::with_validator(NameValidator::new(64));
        assert!(relaxed.register("has space", Vec::<String>::new(), unit()).is_ok());
    }

    #[test]
    fn test_unregister_refuses_in_use() {
        let mut registry = registry();
        match registry.unregister("config") {
            Err(ContainerError::InUse { name, dependents }) => {
                assert_eq!(name, "config");
                assert_eq!(dependents, vec!["db", "service"]);
            }
            other => panic!("Expected InUse, got {:?}", other),
        }
        assert!(registry.contains("config"));
    }

    #[test]
    fn test_unregister_leaf_and_missing() {
        let mut registry = registry();
        let removed = registry.unregister("service").unwrap();
        assert_eq!(removed.name(), "service");
        assert!(matches!(
            registry.unregister("service"),
            Err(ContainerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_unregister_cascade_removes_dependents_first() {
        let mut registry = registry();
        let removed = registry.unregister_cascade("db").unwrap();
        assert_eq!(removed, vec!["service", "repo", "db"]);
        assert_eq!(registry.names(), vec!["config"]);
    }

    #[test]
    fn test_self_reference_is_not_a_dependent() {
        let mut registry = Registry::new();
        registry.register("loop", ["loop"], unit()).unwrap();
        assert!(registry.dependents_of("loop").is_empty());
        assert!(registry.unregister("loop").is_ok());
    }
}
