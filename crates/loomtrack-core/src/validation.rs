//! # Validation Module
//!
//! Domain rule validation for Loomtrack inputs.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP layer (outside this workspace)                          │
//! │  ├── Schema checks (types, required JSON fields)                       │
//! │  └── Deserialization into NewInward / NewIssue / NewPiece              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Cross-field rules (damage ≤ meter, marks ordered and in range)    │
//! │  └── Positive lengths, non-empty detail lists                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on status columns                               │
//! │  ├── UNIQUE constraints (codes, running loom)                          │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use loomtrack_core::measure::Measure;
//! use loomtrack_core::validation::validate_marks;
//!
//! let meter = Measure::from_whole(200);
//! let marks = [Measure::from_whole(50), Measure::from_whole(100)];
//! assert!(validate_marks(&marks, meter).is_ok());
//! ```

use crate::error::ValidationError;
use crate::measure::Measure;
use crate::types::{NewInward, NewIssue, NewPiece, NewReceive};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

fn must_be_positive(field: &str) -> ValidationError {
    ValidationError::MustBePositive {
        field: field.to_string(),
    }
}

fn require_text(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(required(field));
    }
    Ok(())
}

// =============================================================================
// Inward
// =============================================================================

/// Validates a new inward batch.
///
/// ## Rules
/// - At least one detail line
/// - Every detail has a set number and a positive sizing length
/// - Tolerance, when given, is positive
pub fn validate_new_inward(inward: &NewInward) -> ValidationResult<()> {
    if inward.details.is_empty() {
        return Err(required("details"));
    }

    for detail in &inward.details {
        require_text("set_number", &detail.set_number)?;
        if !detail.sizing_meter.is_positive() {
            return Err(must_be_positive("sizing_meter"));
        }
        if let Some(ltol) = detail.ltol_meter {
            if !ltol.is_positive() {
                return Err(must_be_positive("ltol_meter"));
            }
        }
    }

    Ok(())
}

// =============================================================================
// Issue
// =============================================================================

/// Validates a new beam issue.
///
/// ## Rules
/// - `width_split_factor` ≥ 1
/// - Lengths, when given, are not negative
pub fn validate_new_issue(issue: &NewIssue) -> ValidationResult<()> {
    require_text("beam_id", &issue.beam_id)?;

    if issue.width_split_factor < 1 {
        return Err(ValidationError::TooSmall {
            field: "width_split_factor".to_string(),
            min: 1,
        });
    }

    for (field, value) in [
        ("expected_fabric_meter", issue.expected_fabric_meter),
        ("roll_length", issue.roll_length),
        ("grey_ltol", issue.grey_ltol),
    ] {
        if value.is_some_and(|m| m.is_negative()) {
            return Err(must_be_positive(field));
        }
    }

    Ok(())
}

// =============================================================================
// Receive
// =============================================================================

pub fn validate_new_receive(receive: &NewReceive) -> ValidationResult<()> {
    require_text("beam_id", &receive.beam_id)?;
    require_text("design_id", &receive.design_id)
}

/// Validates the amounts of a piece.
///
/// ## Rules
/// - `main_piece_no` and `meter` positive
/// - Damage not negative and not above the gross meter
pub fn validate_piece_amounts(piece: &NewPiece) -> ValidationResult<()> {
    if piece.main_piece_no <= 0 {
        return Err(must_be_positive("main_piece_no"));
    }
    if !piece.meter.is_positive() {
        return Err(must_be_positive("meter"));
    }
    if piece.damaged_meter.is_negative() {
        return Err(must_be_positive("damaged_meter"));
    }
    if piece.damaged_meter > piece.meter {
        return Err(ValidationError::DamageExceedsGross);
    }
    Ok(())
}

/// Validates mark positions against the piece length.
///
/// Each mark is checked for range before its ordering, so the first
/// offending mark decides the error.
pub fn validate_marks(marks: &[Measure], meter: Measure) -> ValidationResult<()> {
    for (i, &mark) in marks.iter().enumerate() {
        if mark.is_negative() || mark > meter {
            return Err(ValidationError::MarkOutOfRange { mark, meter });
        }
        if i > 0 && mark <= marks[i - 1] {
            return Err(ValidationError::MarksNotIncreasing);
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
