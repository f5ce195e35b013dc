//! # VACUNA
//!
//! **NAMED DEPENDENCY CONTAINER WITH LIFETIME-AWARE RESOLUTION**
//!
//! **ARCHITECTURE**: Registry of named providers, a cycle-checked graph
//! builder, and a container that walks the graph dependency-first
//! **GUARANTEE**: Structural errors (missing names, cycles, captive
//! dependencies) surface before any constructor runs
//! **LIFETIMES**: `transient` per call, `singleton` per container,
//! `resource` per scope with teardown on exit
//!
//! ## USAGE
//!
//! ```rust
//! use vacuna::{Container, Provider};
//!
//! let container = Container::new();
//! container
//!     .register("port", Vec::<String>::new(), Provider::singleton(|_| Ok(8080u16)))
//!     .unwrap();
//! container
//!     .register(
//!         "addr",
//!         ["port"],
//!         Provider::transient(|args| Ok(format!("127.0.0.1:{}", args.get::<u16>(0)?))),
//!     )
//!     .unwrap();
//!
//! let addr = container.get_as::<String>("addr").unwrap();
//! assert_eq!(addr.as_str(), "127.0.0.1:8080");
//! ```

pub mod api;
pub mod config;
pub mod dependencies;
pub mod errors;
pub mod graph;
pub mod manifest;

// **VALIDATION MODULE REGISTRATION**
pub mod validation;

pub use api::*;
