//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures (→ 400)              │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures (→ 500 / 503)                 │
//! │                                                                         │
//! │  tally-server errors                                                   │
//! │  └── ApiError         - What HTTP callers see                          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → {status:"error"}       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A classifier pattern failed to compile.
    #[error("Invalid classifier pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// CSV rendering failed.
    #[error("Export failed: {0}")]
    Export(#[from] csv::Error),

    /// Writing the rendered export failed.
    #[error("Export write failed: {0}")]
    ExportIo(#[from] std::io::Error),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// They are never retried and never logged as system faults.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., non-numeric amount, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Timestamp lies after the current business-local instant.
    #[error("{field} cannot be in the future")]
    InFuture { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "amount".to_string(),
        };
        assert_eq!(err.to_string(), "amount is required");

        let err = ValidationError::NotAllowed {
            field: "mode".to_string(),
            allowed: vec!["cash".to_string(), "electronic".to_string()],
        };
        assert_eq!(
            err.to_string(),
            r#"mode must be one of: ["cash", "electronic"]"#
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "amount".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
