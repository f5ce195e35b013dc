//! # CONTAINER CONFIGURATION
//!
//! Runtime knobs for a [`Container`](crate::Container). Deserializable so a
//! manifest can carry them in its `settings` section.

use serde::{Deserialize, Serialize};

/// Default maximum dependency name length.
pub const DEFAULT_MAX_NAME_LENGTH: usize = 256;

/// Default pattern every dependency name must match.
pub const DEFAULT_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_.:\-]*$";

/// **CONTAINER CONFIGURATION**
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// **MAXIMUM NAME LENGTH** - in bytes
    pub max_name_length: usize,

    /// **NAME PATTERN** - regex names must match; `None` disables the check
    pub name_pattern: Option<String>,

    /// **LATE REGISTRATION** - allow registry mutation after the first resolution
    pub allow_late_registration: bool,

    /// **GRAPH CACHE** - reuse resolution graphs per root until the registry changes
    pub cache_graphs: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            name_pattern: Some(DEFAULT_NAME_PATTERN.to_string()),
            allow_late_registration: false,
            cache_graphs: true,
        }
    }
}

impl ContainerConfig {
    pub fn with_late_registration(mut self, allow: bool) -> Self {
        self.allow_late_registration = allow;
        self
    }

    pub fn with_name_pattern(mut self, pattern: Option<&str>) -> Self {
        self.name_pattern = pattern.map(str::to_string);
        self
    }

    pub fn with_max_name_length(mut self, max_name_length: usize) -> Self {
        self.max_name_length = max_name_length;
        self
    }

    pub fn with_graph_cache(mut self, enabled: bool) -> Self {
        self.cache_graphs = enabled;
        self
    }
}
