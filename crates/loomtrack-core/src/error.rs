//! # Error Types
//!
//! Domain-specific error types for loomtrack-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  loomtrack-core errors (this file)                                     │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  loomtrack-db errors (separate crate)                                  │
//! │  └── DbError          - Storage failures + wrapped CoreError           │
//! │                                                                         │
//! │  HTTP layer (outside this workspace)                                   │
//! │  └── maps ErrorKind → status code                                      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ErrorKind → HTTP        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::measure::Measure;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse category of a failure, stable for callers mapping to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Conflict,
    Validation,
    NothingToConfirm,
    /// Lock timeout, constraint violation, lost connection.
    Storage,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A status transition outside the entity's table.
    ///
    /// ## User Workflow
    /// ```text
    /// complete(issue)   ── RUNNING → COMPLETED ✓
    ///      │
    ///      ▼
    /// complete(issue)   ── COMPLETED → ?
    ///      │
    ///      ▼
    /// InvalidTransition { entity: "Issue", from: "COMPLETED", action: "complete" }
    /// ```
    #[error("{entity} is {from}, cannot {action}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        action: &'static str,
    },

    /// Operation would violate a cross-entity invariant.
    #[error("{0}")]
    Conflict(String),

    /// Confirmation of a batch whose net length is not positive.
    #[error("No net meter to confirm (net {net})")]
    NothingToConfirm { net: Measure },

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InvalidTransition { .. } => ErrorKind::InvalidState,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::NothingToConfirm { .. } => ErrorKind::NothingToConfirm,
            CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Messages are shown to operators verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be at least `min`.
    #[error("{field} must be at least {min}")]
    TooSmall { field: String, min: i64 },

    #[error("Damaged meter cannot exceed meter")]
    DamageExceedsGross,

    #[error("Mark {} out of range for piece meter {}", .mark.as_f64(), .meter.as_f64())]
    MarkOutOfRange { mark: Measure, meter: Measure },

    #[error("Marks must be strictly increasing")]
    MarksNotIncreasing,
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
    fn test_error_messages() {
        let err = CoreError::InvalidTransition {
            entity: "Issue",
            from: "COMPLETED".to_string(),
            action: "complete",
        };
        assert_eq!(err.to_string(), "Issue is COMPLETED, cannot complete");

        let err = CoreError::not_found("Beam", "abc");
        assert_eq!(err.to_string(), "Beam not found: abc");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::DamageExceedsGross.to_string(),
            "Damaged meter cannot exceed meter"
        );
        assert_eq!(
            ValidationError::MarksNotIncreasing.to_string(),
            "Marks must be strictly increasing"
        );
        let err = ValidationError::MarkOutOfRange {
            mark: Measure::from_whole(250),
            meter: Measure::from_whole(200),
        };
        assert_eq!(
            err.to_string(),
            "Mark 250 out of range for piece meter 200"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::MarksNotIncreasing.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
        assert_eq!(core_err.to_string(), "Marks must be strictly increasing");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(CoreError::not_found("Beam", "x").kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::Conflict("busy".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            CoreError::InvalidTransition {
                entity: "Receive",
                from: "CONFIRMED".into(),
                action: "add pieces to",
            }
            .kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            CoreError::NothingToConfirm { net: Measure::zero() }.kind(),
            ErrorKind::NothingToConfirm
        );
    }
}
