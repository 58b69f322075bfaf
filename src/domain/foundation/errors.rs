//! Error types for value object construction.

use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: &'static str },

    #[error("Field '{field}' has invalid value: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: &'static str) -> Self {
        ValidationError::EmptyField { field }
    }

    /// Creates an invalid value validation error.
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_displays_correctly() {
        let err = ValidationError::empty_field("session_key");
        assert_eq!(format!("{}", err), "Field 'session_key' cannot be empty");
    }

    #[test]
    fn invalid_value_displays_correctly() {
        let err = ValidationError::invalid_value("amount", "must not be negative");
        assert_eq!(
            format!("{}", err),
            "Field 'amount' has invalid value: must not be negative"
        );
    }
}
