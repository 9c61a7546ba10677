//! Validation error types

use std::fmt;

/// Validation error raised while turning request input into domain values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is empty (after trimming) when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length in characters
    TooLong { field: &'static str, max: usize },

    /// Field contains characters or a shape that is not accepted
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Numeric field below its lower bound
    TooSmall { field: &'static str, min: i64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => write!(f, "{}: {}", field, reason),
            Self::TooSmall { field, min } => write!(f, "{} must be at least {}", field, min),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "groupNumber",
            max: 31,
        };
        assert_eq!(
            err.to_string(),
            "groupNumber exceeds maximum length of 31 characters"
        );

        let err = ValidationError::TooSmall { field: "take", min: 1 };
        assert_eq!(err.to_string(), "take must be at least 1");
    }
}
