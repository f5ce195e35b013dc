//! # DECLARATIVE MANIFESTS
//!
//! JSON description of a container's wiring. Constructors cannot live in
//! JSON, so each entry names a factory that a [`FactoryCatalog`] maps to code.
//!
//! ```json
//! {
//!   "settings": { "allow_late_registration": false },
//!   "dependencies": [
//!     { "name": "db", "depends_on": ["config"], "lifetime": "singleton", "factory": "app::db" }
//!   ]
//! }
//! ```

pub mod catalog;
pub mod types;

pub use catalog::FactoryCatalog;
pub use types::{Manifest, ManifestEntry};
