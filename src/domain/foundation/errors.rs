//! Error types for the domain layer.

use thiserror::Error;

/// Errors that occur during value object construction or payload validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::EmptyField { field } => field,
            ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_empty_field_displays_correctly() {
        let err = ValidationError::empty_field("text");
        assert_eq!(format!("{}", err), "Field 'text' cannot be empty");
    }

    #[test]
    fn validation_error_invalid_format_displays_correctly() {
        let err = ValidationError::invalid_format("lead_id", "contains spaces");
        assert_eq!(
            format!("{}", err),
            "Field 'lead_id' has invalid format: contains spaces"
        );
    }

    #[test]
    fn field_names_the_offending_field() {
        assert_eq!(ValidationError::empty_field("text").field(), "text");
        assert_eq!(
            ValidationError::invalid_format("event_id", "too long").field(),
            "event_id"
        );
    }
}
