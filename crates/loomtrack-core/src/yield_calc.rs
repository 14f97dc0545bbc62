//! # Expected Yield
//!
//! How much fabric an issued beam should produce.
//!
//! ```text
//! expected  = given expected fabric meter
//!           | (sizing / sizing_ltol) × grey_ltol    when not given (or 0)
//!
//! base_roll_count     = ⌈expected / roll_length⌉    when roll_length > 0
//! expected_roll_count = base_roll_count × width_split_factor
//! expected_total      = expected × width_split_factor
//! ```
//!
//! Any input that leaves a quantity undefined (missing tolerance, zero
//! divisor) yields `None` for it and everything derived from it.

use serde::{Deserialize, Serialize};

use crate::measure::Measure;

/// Inputs to the yield formulas, snapshotted at issue time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YieldInput {
    pub sizing_meter: Measure,
    pub sizing_ltol: Option<Measure>,
    pub grey_ltol: Option<Measure>,
    pub expected_fabric_meter: Option<Measure>,
    pub roll_length: Option<Measure>,
    pub width_split_factor: i64,
}

/// Derived expected-yield fields of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExpectedYield {
    pub expected_fabric_meter: Option<Measure>,
    pub base_roll_count: Option<i64>,
    pub expected_roll_count: Option<i64>,
    pub expected_total_output_meter: Option<Measure>,
}

/// Computes the expected yield of an issue.
///
/// ```rust
/// use loomtrack_core::measure::Measure;
/// use loomtrack_core::yield_calc::{expected_yield, YieldInput};
///
/// let y = expected_yield(&YieldInput {
///     sizing_meter: Measure::from_whole(1000),
///     sizing_ltol: Some(Measure::from_whole(100)),
///     grey_ltol: Some(Measure::from_whole(95)),
///     expected_fabric_meter: None,
///     roll_length: Some(Measure::from_whole(100)),
///     width_split_factor: 2,
/// });
/// assert_eq!(y.expected_fabric_meter, Some(Measure::from_whole(950)));
/// assert_eq!(y.base_roll_count, Some(10));
/// assert_eq!(y.expected_roll_count, Some(20));
/// assert_eq!(y.expected_total_output_meter, Some(Measure::from_whole(1900)));
/// ```
pub fn expected_yield(input: &YieldInput) -> ExpectedYield {
    let given = input.expected_fabric_meter.filter(|m| !m.is_zero());
    let expected = match given {
        Some(m) => Some(m),
        None => derive_from_tolerances(input),
    };

    let base_roll_count = match (expected, input.roll_length) {
        (Some(e), Some(roll)) if roll.is_positive() && !e.is_zero() => e.ceil_div(roll),
        _ => None,
    };

    let factor = input.width_split_factor.max(1);

    ExpectedYield {
        expected_fabric_meter: expected,
        base_roll_count,
        expected_roll_count: base_roll_count.map(|n| n * factor),
        expected_total_output_meter: expected.map(|e| e * factor),
    }
}

fn derive_from_tolerances(input: &YieldInput) -> Option<Measure> {
    let sizing_ltol = input.sizing_ltol.filter(|m| !m.is_zero())?;
    let grey_ltol = input.grey_ltol.filter(|m| !m.is_zero())?;
    let ratio = input.sizing_meter.as_f64() / sizing_ltol.as_f64();
    Some(Measure::from_f64(ratio * grey_ltol.as_f64()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> YieldInput {
        YieldInput {
            sizing_meter: Measure::from_whole(1000),
            sizing_ltol: None,
            grey_ltol: None,
            expected_fabric_meter: None,
            roll_length: None,
            width_split_factor: 1,
        }
    }

    #[test]
    fn test_nothing_known() {
        assert_eq!(expected_yield(&base()), ExpectedYield::default());
    }

    #[test]
    fn test_given_expected_wins() {
        let y = expected_yield(&YieldInput {
            expected_fabric_meter: Some(Measure::from_whole(800)),
            sizing_ltol: Some(Measure::from_whole(100)),
            grey_ltol: Some(Measure::from_whole(95)),
            roll_length: Some(Measure::from_whole(300)),
            ..base()
        });
        assert_eq!(y.expected_fabric_meter, Some(Measure::from_whole(800)));
        assert_eq!(y.base_roll_count, Some(3));
        assert_eq!(y.expected_roll_count, Some(3));
    }

    #[test]
    fn test_zero_expected_is_derived() {
        let y = expected_yield(&YieldInput {
            expected_fabric_meter: Some(Measure::zero()),
            sizing_ltol: Some(Measure::from_whole(100)),
            grey_ltol: Some(Measure::from_whole(90)),
            ..base()
        });
        assert_eq!(y.expected_fabric_meter, Some(Measure::from_whole(900)));
        assert_eq!(y.base_roll_count, None);
        assert_eq!(y.expected_total_output_meter, Some(Measure::from_whole(900)));
    }

    #[test]
    fn test_zero_tolerance_is_undefined() {
        let y = expected_yield(&YieldInput {
            sizing_ltol: Some(Measure::zero()),
            grey_ltol: Some(Measure::from_whole(90)),
            roll_length: Some(Measure::from_whole(100)),
            width_split_factor: 2,
            ..base()
        });
        assert_eq!(y, ExpectedYield::default());
    }

    #[test]
    fn test_missing_grey_tolerance() {
        let y = expected_yield(&YieldInput {
            sizing_ltol: Some(Measure::from_whole(100)),
            ..base()
        });
        assert_eq!(y.expected_fabric_meter, None);
    }

    #[test]
    fn test_non_positive_roll_length() {
        let y = expected_yield(&YieldInput {
            expected_fabric_meter: Some(Measure::from_whole(500)),
            roll_length: Some(Measure::zero()),
            width_split_factor: 3,
            ..base()
        });
        assert_eq!(y.base_roll_count, None);
        assert_eq!(y.expected_roll_count, None);
        assert_eq!(y.expected_total_output_meter, Some(Measure::from_whole(1500)));
    }

    #[test]
    fn test_fractional_ratio_rounds_to_four_decimals() {
        let y = expected_yield(&YieldInput {
            sizing_ltol: Some(Measure::from_whole(3)),
            grey_ltol: Some(Measure::from_whole(1)),
            ..base()
        });
        assert_eq!(y.expected_fabric_meter, Some(Measure::from_f64(333.3333)));
    }
}
