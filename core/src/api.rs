//! Flat re-export of the public surface.

pub use crate::config::ContainerConfig;
pub use crate::dependencies::{
    Args, Container, Dependency, Factory, Instance, Lifetime, Provider, Registry, RegistryEntry,
    Scope,
};
pub use crate::errors::{ArgumentError, BoxError, ContainerError, TeardownFailure};
pub use crate::graph::{GraphBuilder, ResolutionGraph};
pub use crate::manifest::{FactoryCatalog, Manifest, ManifestEntry};
pub use crate::validation::{NameValidator, Validator};
