//! # Measure Module
//!
//! Provides the `Measure` type for lengths (meters) and weights.
//!
//! ## Why Fixed-Point?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  A beam of 1000 m receives pieces of 333.3333 m three times:            │
//! │    1000.0 - 333.3333 - 333.3333 - 333.3333 = 0.00009999999997  ❌       │
//! │                                                                         │
//! │  Remaining length drifts and "remaining ≤ 0" checks become flaky.       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer ten-thousandths                                  │
//! │    10_000_000 - 3 × 3_333_333 = 1 unit (0.0001 m), exactly              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every length and weight is kept to exactly four decimals. Values enter
//! through [`Measure::from_f64`] (rounded half away from zero) or
//! [`Measure::from_units`], and are stored as INTEGER columns.
//!
//! ## Usage
//! ```rust
//! use loomtrack_core::measure::Measure;
//!
//! let sizing = Measure::from_f64(1000.0);
//! let piece = Measure::from_f64(120.55);
//!
//! let remaining = sizing - piece;
//! assert_eq!(remaining.to_string(), "879.4500");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Number of stored units per whole meter (or kilogram).
pub const UNITS_PER_WHOLE: i64 = 10_000;

// =============================================================================
// Measure Type
// =============================================================================

/// A length or weight in ten-thousandths of the whole unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: remaining length may go negative after an approved
///   `allow_negative` override
/// - **Serialized as a decimal number**: callers see `1000.5`, never `10005000`
///
/// ## Where Measure is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Beam.sizing_meter ──► Beam.total_meter ──► Beam.remaining_meter        │
/// │                                                  ▲                      │
/// │  PieceRow.meter - damaged_meter = net_meter ─────┘ (at confirmation)    │
/// │                                                                         │
/// │  Issue.expected_fabric_meter ──► expected_total_output                  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Measure(i64);

impl Measure {
    /// Creates a Measure from raw ten-thousandth units.
    ///
    /// ```rust
    /// use loomtrack_core::measure::Measure;
    ///
    /// let m = Measure::from_units(12_345);
    /// assert_eq!(m.to_string(), "1.2345");
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Measure(units)
    }

    /// Creates a Measure from whole meters.
    #[inline]
    pub const fn from_whole(whole: i64) -> Self {
        Measure(whole * UNITS_PER_WHOLE)
    }

    /// Creates a Measure from a decimal value, rounding to four decimals.
    ///
    /// Non-finite input becomes zero.
    ///
    /// ```rust
    /// use loomtrack_core::measure::Measure;
    ///
    /// assert_eq!(Measure::from_f64(0.12346).units(), 1235);
    /// assert_eq!(Measure::from_f64(-0.12346).units(), -1235);
    /// ```
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Measure::zero();
        }
        Measure((value * UNITS_PER_WHOLE as f64).round() as i64)
    }

    /// Returns the raw ten-thousandth units.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    /// Returns the value as a decimal number (for display and JSON).
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / UNITS_PER_WHOLE as f64
    }

    /// Returns the whole-meter value when there is no fractional part.
    #[inline]
    pub const fn as_whole(&self) -> Option<i64> {
        if self.0 % UNITS_PER_WHOLE == 0 {
            Some(self.0 / UNITS_PER_WHOLE)
        } else {
            None
        }
    }

    #[inline]
    pub const fn zero() -> Self {
        Measure(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns `pct` percent of this value, rounded to four decimals.
    ///
    /// ```rust
    /// use loomtrack_core::measure::Measure;
    ///
    /// let total = Measure::from_whole(1000);
    /// assert_eq!(total.percent(2.0), Measure::from_whole(20));
    /// ```
    pub fn percent(&self, pct: f64) -> Measure {
        Measure::from_f64(self.as_f64() * pct / 100.0)
    }

    /// Divides by a count, rounding half away from zero.
    ///
    /// Returns `None` for a zero divisor.
    pub fn div_round(&self, count: i64) -> Option<Measure> {
        if count == 0 {
            return None;
        }
        let num = self.0 as i128;
        let den = count as i128;
        let quotient = num / den;
        let remainder = num % den;
        let rounded = if remainder.abs() * 2 >= den.abs() {
            quotient + num.signum() * den.signum()
        } else {
            quotient
        };
        Some(Measure(rounded as i64))
    }

    /// Number of whole `step`s needed to cover this value (ceiling division).
    ///
    /// Returns `None` unless `step` is positive.
    ///
    /// ```rust
    /// use loomtrack_core::measure::Measure;
    ///
    /// let expected = Measure::from_whole(250);
    /// assert_eq!(expected.ceil_div(Measure::from_whole(100)), Some(3));
    /// assert_eq!(expected.ceil_div(Measure::zero()), None);
    /// ```
    pub fn ceil_div(&self, step: Measure) -> Option<i64> {
        if step.0 <= 0 {
            return None;
        }
        let q = self.0.div_euclid(step.0);
        if self.0.rem_euclid(step.0) == 0 {
            Some(q)
        } else {
            Some(q + 1)
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Always prints four decimals, e.g. `879.4500`.
impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / UNITS_PER_WHOLE as u64;
        let frac = abs % UNITS_PER_WHOLE as u64;
        write!(f, "{}{}.{:04}", sign, whole, frac)
    }
}

impl Serialize for Measure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Measure {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(serde::de::Error::custom("measure must be a finite number"));
        }
        Ok(Measure::from_f64(value))
    }
}

impl Add for Measure {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Measure(self.0 + other.0)
    }
}

impl AddAssign for Measure {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Measure {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Measure(self.0 - other.0)
    }
}

impl SubAssign for Measure {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Measure {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Measure(-self.0)
    }
}

/// Multiplication by a count (width split factor, roll count).
impl Mul<i64> for Measure {
    type Output = Self;

    #[inline]
    fn mul(self, factor: i64) -> Self {
        Measure(self.0 * factor)
    }
}

impl Sum for Measure {
    fn sum<I: Iterator<Item = Measure>>(iter: I) -> Self {
        iter.fold(Measure::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f64_rounds_to_four_decimals() {
        assert_eq!(Measure::from_f64(1000.0).units(), 10_000_000);
        assert_eq!(Measure::from_f64(12.34566).units(), 123_457);
        assert_eq!(Measure::from_f64(f64::NAN), Measure::zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(Measure::from_units(10_005_000).to_string(), "1000.5000");
        assert_eq!(Measure::from_units(-500_000).to_string(), "-50.0000");
        assert_eq!(Measure::from_units(-1).to_string(), "-0.0001");
        assert_eq!(Measure::zero().to_string(), "0.0000");
    }

    #[test]
    fn test_arithmetic_is_exact() {
        let beam = Measure::from_whole(1000);
        let piece = Measure::from_f64(333.3333);
        let remaining = beam - piece - piece - piece;
        assert_eq!(remaining.units(), 1);

        let mut total = Measure::zero();
        total += Measure::from_whole(5);
        total -= Measure::from_whole(2);
        assert_eq!(total, Measure::from_whole(3));
        assert_eq!(-total, Measure::from_whole(-3));
        assert_eq!(total * 2, Measure::from_whole(6));
    }

    #[test]
    fn test_percent() {
        assert_eq!(Measure::from_whole(1000).percent(2.0), Measure::from_whole(20));
        assert_eq!(Measure::from_whole(1000).percent(0.0), Measure::zero());
        assert_eq!(Measure::from_whole(500).percent(2.5), Measure::from_f64(12.5));
    }

    #[test]
    fn test_div_round() {
        assert_eq!(Measure::from_units(10).div_round(3), Some(Measure::from_units(3)));
        assert_eq!(Measure::from_units(11).div_round(2), Some(Measure::from_units(6)));
        assert_eq!(Measure::from_units(-11).div_round(2), Some(Measure::from_units(-6)));
        assert_eq!(Measure::from_units(11).div_round(0), None);
    }

    #[test]
    fn test_ceil_div() {
        let expected = Measure::from_whole(250);
        assert_eq!(expected.ceil_div(Measure::from_whole(100)), Some(3));
        assert_eq!(expected.ceil_div(Measure::from_whole(50)), Some(5));
        assert_eq!(Measure::zero().ceil_div(Measure::from_whole(50)), Some(0));
        assert_eq!(expected.ceil_div(Measure::from_whole(-1)), None);
    }

    #[test]
    fn test_serde_as_decimal() {
        let m = Measure::from_f64(120.55);
        assert_eq!(serde_json::to_string(&m).unwrap(), "120.55");

        let back: Measure = serde_json::from_str("120.55").unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_as_whole() {
        assert_eq!(Measure::from_whole(1000).as_whole(), Some(1000));
        assert_eq!(Measure::from_whole(-3).as_whole(), Some(-3));
        assert_eq!(Measure::from_f64(99.5).as_whole(), None);
        assert_eq!(Measure::zero().as_whole(), Some(0));
    }

    #[test]
    fn test_sum() {
        let total: Measure = [Measure::from_whole(1), Measure::from_f64(0.5)]
            .into_iter()
            .sum();
        assert_eq!(total, Measure::from_f64(1.5));
    }
}
