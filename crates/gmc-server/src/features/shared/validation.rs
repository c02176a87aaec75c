//! Shared validation utilities

use thiserror::Error;

/// Errors that can occur during name validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameValidationError {
    #[error("{field} is required and cannot be empty")]
    Required { field: &'static str },

    #[error("{field} must be between 1 and {max_length} characters")]
    TooLong {
        field: &'static str,
        max_length: usize,
    },
}

/// Validate a required, length-limited name
///
/// # Rules
/// - Must not be empty or whitespace
/// - Must fit the column (`max_length` characters)
pub fn validate_name(
    value: &str,
    field: &'static str,
    max_length: usize,
) -> Result<(), NameValidationError> {
    if value.trim().is_empty() {
        return Err(NameValidationError::Required { field });
    }
    if value.chars().count() > max_length {
        return Err(NameValidationError::TooLong { field, max_length });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("genebuild", "dataset_type", 32).is_ok());
        assert_eq!(
            validate_name("  ", "dataset_type", 32),
            Err(NameValidationError::Required { field: "dataset_type" })
        );
        assert_eq!(
            validate_name(&"x".repeat(33), "dataset_type", 32),
            Err(NameValidationError::TooLong {
                field: "dataset_type",
                max_length: 32
            })
        );
    }
}
