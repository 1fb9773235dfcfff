//! Validation of configuration values
//!
//! Each config section implements [`ConfigSection`]; [`Validator`] holds the
//! shared field checks.

pub use crate::error::ValidationError;
use std::fmt::Display;
use std::path::Path;

/// A section of `config.toml` that can check and merge itself
pub trait ConfigSection: Default {
    /// Returns every invalid field, or `Ok` when the section is usable
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Takes every value from `other`
    fn merge(&mut self, other: Self);

    /// Table name in the TOML file
    fn section_name(&self) -> &'static str;
}

/// Common field checks
pub struct Validator;

impl Validator {
    /// Checks `min <= value <= max`
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + Display + Copy,
    {
        if value < min || value > max {
            Err(ValidationError::with_value(
                field,
                format!("must be between {} and {}", min, max),
                value,
            ))
        } else {
            Ok(())
        }
    }

    /// Checks `value >= min`
    pub fn at_least<T>(value: T, min: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + Display + Copy,
    {
        if value < min {
            Err(ValidationError::with_value(
                field,
                format!("must be at least {}", min),
                value,
            ))
        } else {
            Ok(())
        }
    }

    /// Checks that an optional path, when set, is not empty
    pub fn optional_path(path: Option<&Path>, field: &str) -> Result<(), ValidationError> {
        match path {
            Some(path) if path.as_os_str().is_empty() => {
                Err(ValidationError::new(field, "must not be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Collects the failures of several checks
    pub fn collect_errors(
        results: Vec<Result<(), ValidationError>>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = results.into_iter().filter_map(|r| r.err()).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
