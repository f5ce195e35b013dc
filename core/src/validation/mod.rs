//! # VALIDATION MODULE
//!
//! **TRAIT-BASED INPUT VALIDATION FOR REGISTRATIONS**
//!
//! Every name entering a [`Registry`](crate::Registry) passes through a
//! [`Validator`] before it is stored.
//!
//! ## USAGE
//!
//! ```rust
//! use vacuna::validation::{NameValidator, Validator};
//!
//! let validator = NameValidator::new(64);
//! assert!(validator.validate("database").is_ok());
//! assert!(validator.validate("").is_err());
//! ```

use crate::errors::ContainerError;

pub mod validators;

pub use validators::NameValidator;

/// **CORE VALIDATOR TRAIT**
///
/// **GUARANTEE**: MUST NOT panic. ALL error conditions MUST return `ContainerError`.
pub trait Validator<Input: ?Sized> {
    /// **OUTPUT TYPE** - Validated data type returned on success
    type Output;

    /// **VALIDATION EXECUTION**
    ///
    /// **RETURNS**:
    /// - `Ok(Self::Output)` - Successfully validated data
    /// - `Err(ContainerError)` - Validation failure with structured error
    fn validate(&self, input: &Input) -> Result<Self::Output, ContainerError>;
}

/// **VALIDATION RESULT TYPE ALIAS**
pub type ValidationResult<T> = Result<T, ContainerError>;
