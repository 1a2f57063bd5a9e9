//! Validation utilities for request DTOs at the REST/gRPC boundary.

use crate::MatcherError;
use validator::{Validate, ValidationErrors};

/// Extension trait for validation.
pub trait ValidateExt: Validate {
    /// Validates the struct and returns a `MatcherError` on failure.
    fn validate_request(&self) -> Result<(), MatcherError> {
        self.validate().map_err(validation_errors_to_matcher_error)
    }
}

impl<T: Validate> ValidateExt for T {}

/// Converts `validator::ValidationErrors` to `MatcherError`.
#[must_use]
pub fn validation_errors_to_matcher_error(errors: ValidationErrors) -> MatcherError {
    let message = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                let detail = error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), |m| m.to_string());
                format!("{field}: {detail}")
            })
        })
        .collect::<Vec<_>>()
        .join("; ");

    MatcherError::Validation(message)
}

/// Common validation functions used by configuration and request DTOs.
pub mod rules {
    use validator::ValidationError;

    /// Validates that a string is not blank (not empty after trimming).
    pub fn not_blank(value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new("not_blank"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::rules::*;

    #[test]
    fn test_not_blank() {
        assert!(not_blank("hello").is_ok());
        assert!(not_blank("   ").is_err());
        assert!(not_blank("").is_err());
    }
}
