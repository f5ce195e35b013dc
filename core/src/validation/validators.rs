//! # CONCRETE VALIDATOR IMPLEMENTATIONS

use super::{ValidationResult, Validator};
use crate::config::{ContainerConfig, DEFAULT_MAX_NAME_LENGTH, DEFAULT_NAME_PATTERN};
use crate::errors::ContainerError;
use once_cell::sync::Lazy;
use regex::Regex;

// Compiled once per process; the literal is checked by the tests below
static DEFAULT_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_NAME_PATTERN).expect("default name pattern compiles"));

// ================================================================================================
// NAME VALIDATOR - Dependency name constraints
// ================================================================================================

/// **NAME VALIDATOR**
///
/// **PURPOSE**: Rejects empty, oversized and malformed dependency names.
/// **PERFORMANCE**: O(n) in the name length; the pattern is compiled once.
#[derive(Debug, Clone)]
pub struct NameValidator {
    /// **MAXIMUM LENGTH** - Name length limit in bytes
    max_length: usize,

    /// **PATTERN** - Optional regex every name must match
    pattern: Option<Regex>,
}

impl NameValidator {
    /// **CONSTRUCTOR** - Length check only
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            pattern: None,
        }
    }

    /// **CONSTRUCTOR WITH PATTERN**
    ///
    /// **ERRORS**: `InvalidConfig` when `pattern` is not a valid regex.
    pub fn with_pattern(mut self, pattern: &str) -> ValidationResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| ContainerError::InvalidConfig {
            message: format!("invalid name pattern '{}': {}", pattern, e),
        })?;
        self.pattern = Some(regex);
        Ok(self)
    }

    /// **STANDARD** - what [`ContainerConfig::default`] describes
    pub fn standard() -> Self {
        Self {
            max_length: DEFAULT_MAX_NAME_LENGTH,
            pattern: Some(DEFAULT_NAME_REGEX.clone()),
        }
    }

    /// **CONSTRUCTOR FROM CONFIG**
    pub fn from_config(config: &ContainerConfig) -> ValidationResult<Self> {
        let validator = Self::new(config.max_name_length);
        match config.name_pattern.as_deref() {
            Some(DEFAULT_NAME_PATTERN) => Ok(Self {
                pattern: Some(DEFAULT_NAME_REGEX.clone()),
                ..validator
            }),
            Some(pattern) => validator.with_pattern(pattern),
            None => Ok(validator),
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn reject(name: &str, reason: String) -> ContainerError {
        ContainerError::InvalidName {
            name: name.to_string(),
            reason,
        }
    }
}

impl Default for NameValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NAME_LENGTH)
    }
}

impl Validator<str> for NameValidator {
    type Output = ();

    fn validate(&self, input: &str) -> ValidationResult<()> {
        // **STEP 1**: Names are map keys, an empty one is never meaningful
        if input.is_empty() {
            return Err(Self::reject(input, "name cannot be empty".to_string()));
        }

        // **STEP 2**: Length limit
        if input.len() > self.max_length {
            return Err(Self::reject(
                input,
                format!("name exceeds maximum length ({})", self.max_length),
            ));
        }

        // **STEP 3**: Pattern
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(input) {
                return Err(Self::reject(
                    input,
                    format!("name does not match pattern {}", pattern.as_str()),
                ));
            }
        }

        Ok(())
    }
}
