use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by user constructors, hooks and tasks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// **CONTAINER ERROR**
///
/// **GUARANTEE**: Every variant names the offending dependency so a broken
/// wiring can be diagnosed without stepping through the graph by hand.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("DUPLICATE NAME: dependency '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("NOT FOUND: dependency '{name}' is not registered")]
    NotFound { name: String },

    #[error("IN USE: dependency '{name}' is still required by {}", .dependents.join(", "))]
    InUse { name: String, dependents: Vec<String> },

    #[error("INVALID LIFETIME: '{value}' (expected transient, singleton or resource)")]
    InvalidLifetime { value: String },

    #[error("INVALID NAME: '{name}' - {reason}")]
    InvalidName { name: String, reason: String },

    #[error("REGISTRY SEALED: cannot change '{name}' after the first resolution")]
    RegistrySealed { name: String },

    #[error("MISSING DEPENDENCY: '{name}' (required by '{referenced_by}') is not registered")]
    MissingDependency { name: String, referenced_by: String },

    #[error("CYCLIC DEPENDENCY: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error("CAPTIVE DEPENDENCY: singleton '{name}' requires resource-scoped '{dependency}'")]
    CaptiveDependency { name: String, dependency: String },

    #[error("SCOPE REQUIRED: resource '{name}' (needed by '{root}') must be resolved inside a scope")]
    ScopeRequired { name: String, root: String },

    #[error("PROVIDER CONSTRUCTION ERROR: '{name}' - {source}")]
    ProviderConstruction {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("TASK ERROR: task bound to '{name}' failed - {source}")]
    TaskFailed {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("TYPE MISMATCH: '{name}' does not resolve to {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("TEARDOWN ERROR: {} hook(s) failed - {}", .failures.len(), summarize(.failures))]
    AggregateTeardown { failures: Vec<TeardownFailure> },

    #[error("UNKNOWN FACTORY: entry '{name}' references '{factory}'")]
    UnknownFactory { name: String, factory: String },

    #[error("MANIFEST ERROR: {0}")]
    ManifestParse(#[from] serde_json::Error),

    #[error("MANIFEST ERROR: cannot read {}: {source}", .path.display())]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CONFIG ERROR: {message}")]
    InvalidConfig { message: String },
}

impl ContainerError {
    /// **STABLE ERROR CODE** for logs and programmatic matching.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateName { .. } => error_codes::DUPLICATE_NAME,
            Self::NotFound { .. } => error_codes::NOT_FOUND,
            Self::InUse { .. } => error_codes::IN_USE,
            Self::InvalidLifetime { .. } => error_codes::INVALID_LIFETIME,
            Self::InvalidName { .. } => error_codes::INVALID_NAME,
            Self::RegistrySealed { .. } => error_codes::REGISTRY_SEALED,
            Self::MissingDependency { .. } => error_codes::MISSING_DEPENDENCY,
            Self::CyclicDependency { .. } => error_codes::CYCLIC_DEPENDENCY,
            Self::CaptiveDependency { .. } => error_codes::CAPTIVE_DEPENDENCY,
            Self::ScopeRequired { .. } => error_codes::SCOPE_REQUIRED,
            Self::ProviderConstruction { .. } => error_codes::PROVIDER_CONSTRUCTION,
            Self::TaskFailed { .. } => error_codes::TASK_FAILED,
            Self::TypeMismatch { .. } => error_codes::TYPE_MISMATCH,
            Self::AggregateTeardown { .. } => error_codes::AGGREGATE_TEARDOWN,
            Self::UnknownFactory { .. } => error_codes::UNKNOWN_FACTORY,
            Self::ManifestParse(_) | Self::ManifestIo { .. } => error_codes::INVALID_MANIFEST,
            Self::InvalidConfig { .. } => error_codes::INVALID_CONFIG,
        }
    }

    /// Structural errors are detected while building the graph, before any
    /// constructor has been called.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::MissingDependency { .. }
                | Self::CyclicDependency { .. }
                | Self::CaptiveDependency { .. }
                | Self::ScopeRequired { .. }
        )
    }
}

/// A single teardown hook failure collected while unwinding a scope or
/// shutting the container down.
#[derive(Debug, Error)]
#[error("'{name}': {source}")]
pub struct TeardownFailure {
    pub name: String,
    #[source]
    pub source: BoxError,
}

fn summarize(failures: &[TeardownFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// **ARGUMENT ERROR**
///
/// Raised inside a constructor when a positional argument is read with the
/// wrong index or type. Converts into the boxed source of
/// [`ContainerError::ProviderConstruction`] through `?`.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("'{owner}' has {len} argument(s), index {index} is out of range")]
    IndexOutOfRange {
        owner: String,
        index: usize,
        len: usize,
    },

    #[error("'{owner}' does not declare a dependency on '{dependency}'")]
    UnknownDependency { owner: String, dependency: String },

    #[error("argument '{dependency}' of '{owner}' is not a {expected}")]
    TypeMismatch {
        owner: String,
        dependency: String,
        expected: &'static str,
    },
}

/// **ERROR CODES**
///
/// **MANDATE**: Use these standardized codes for consistent error reporting.
pub mod error_codes {
    pub const DUPLICATE_NAME: &str = "VACUNA_REGISTRY_DUPLICATE_NAME";
    pub const NOT_FOUND: &str = "VACUNA_REGISTRY_NOT_FOUND";
    pub const IN_USE: &str = "VACUNA_REGISTRY_IN_USE";
    pub const INVALID_LIFETIME: &str = "VACUNA_REGISTRY_INVALID_LIFETIME";
    pub const INVALID_NAME: &str = "VACUNA_REGISTRY_INVALID_NAME";
    pub const REGISTRY_SEALED: &str = "VACUNA_REGISTRY_SEALED";
    pub const MISSING_DEPENDENCY: &str = "VACUNA_GRAPH_MISSING_DEPENDENCY";
    pub const CYCLIC_DEPENDENCY: &str = "VACUNA_GRAPH_CYCLIC_DEPENDENCY";
    pub const CAPTIVE_DEPENDENCY: &str = "VACUNA_GRAPH_CAPTIVE_DEPENDENCY";
    pub const SCOPE_REQUIRED: &str = "VACUNA_RESOLVE_SCOPE_REQUIRED";
    pub const PROVIDER_CONSTRUCTION: &str = "VACUNA_RESOLVE_PROVIDER_CONSTRUCTION";
    pub const TASK_FAILED: &str = "VACUNA_RESOLVE_TASK_FAILED";
    pub const TYPE_MISMATCH: &str = "VACUNA_RESOLVE_TYPE_MISMATCH";
    pub const AGGREGATE_TEARDOWN: &str = "VACUNA_SCOPE_AGGREGATE_TEARDOWN";
    pub const UNKNOWN_FACTORY: &str = "VACUNA_MANIFEST_UNKNOWN_FACTORY";
    pub const INVALID_MANIFEST: &str = "VACUNA_MANIFEST_INVALID";
    pub const INVALID_CONFIG: &str = "VACUNA_CONFIG_INVALID";
}
