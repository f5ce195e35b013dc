pub(crate) mod cache;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod types;

pub use registry::{Registry, RegistryEntry};
pub use resolver::Container;
pub use scope::Scope;
pub use types::{Args, Dependency, Factory, Instance, Lifetime, Provider};
