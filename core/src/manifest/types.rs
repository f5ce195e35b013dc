use crate::config::ContainerConfig;
use crate::dependencies::resolver::Container;
use crate::dependencies::types::{Lifetime, Provider};
use crate::errors::ContainerError;
use crate::manifest::catalog::FactoryCatalog;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One registration in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,

    #[serde(default)]
    pub depends_on: Vec<String>,

    /// `transient`, `singleton` or `resource`, case-insensitive
    pub lifetime: String,

    /// Reference looked up in the [`FactoryCatalog`]
    pub factory: String,
}

/// **MANIFEST**
///
/// Container settings plus an ordered list of registrations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub settings: ContainerConfig,

    #[serde(default)]
    pub dependencies: Vec<ManifestEntry>,
}

impl Manifest {
    /// **PARSE** from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ContainerError> {
        let manifest: Manifest = serde_json::from_str(json)?;
        log::debug!("Parsed manifest with {} entries", manifest.dependencies.len());
        Ok(manifest)
    }

    /// **LOAD** a JSON manifest from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ContainerError::ManifestIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// **APPLY** every entry to `container`, in manifest order.
    ///
    /// **RETURNS**: number of registrations made.
    /// **ERRORS**: `InvalidLifetime`, `UnknownFactory` and any registration
    /// error. Entries before the failing one stay registered.
    pub fn apply(&self, container: &Container, catalog: &FactoryCatalog) -> Result<usize, ContainerError> {
        for entry in &self.dependencies {
            let lifetime: Lifetime = entry.lifetime.parse()?;
            let factory = catalog
                .get(&entry.factory)
                .ok_or_else(|| ContainerError::UnknownFactory {
                    name: entry.name.clone(),
                    factory: entry.factory.clone(),
                })?;

            container.register(
                &entry.name,
                entry.depends_on.iter().cloned(),
                Provider::new(lifetime, factory.clone()),
            )?;
        }
        Ok(self.dependencies.len())
    }
}

impl Container {
    /// **CONSTRUCTOR FROM MANIFEST**
    ///
    /// Uses the manifest's settings, registers every entry and validates the
    /// whole registry before returning, so wiring mistakes surface here
    /// rather than on the first `get`.
    pub fn from_manifest(manifest: &Manifest, catalog: &FactoryCatalog) -> Result<Self, ContainerError> {
        let container = Container::with_config(manifest.settings.clone())?;
        let registered = manifest.apply(&container, catalog)?;
        container.validate()?;
        log::debug!(
            "Container {} built from manifest ({} entries)",
            container.id(),
            registered
        );
        Ok(container)
    }
}
