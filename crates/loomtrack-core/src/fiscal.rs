//! # Fiscal Year
//!
//! April-to-March fiscal years and the business codes scoped by them.
//!
//! ```text
//! 2025-04-01 ─────────────────────────────► 2026-03-31
//!            FiscalYear { start_year: 2025 }
//!            code()       = "25-26"
//!            short_year() = "25"
//!            format_code("B", 7) = "B-25-0007"
//! ```

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// First month of the fiscal year.
pub const FISCAL_START_MONTH: u32 = 4;

/// Code prefix of a beam number.
pub const BEAM_PREFIX: &str = "B";

/// Code prefix of an inward number.
pub const INWARD_PREFIX: &str = "BI";

/// A fiscal year identified by the calendar year it starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FiscalYear {
    start_year: i32,
}

impl FiscalYear {
    #[inline]
    pub const fn starting(start_year: i32) -> Self {
        FiscalYear { start_year }
    }

    /// April..December belong to the year starting now, January..March to
    /// the one that started the calendar year before.
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use loomtrack_core::fiscal::FiscalYear;
    ///
    /// let d = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
    /// assert_eq!(FiscalYear::for_date(d).code(), "25-26");
    /// let d = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
    /// assert_eq!(FiscalYear::for_date(d).code(), "26-27");
    /// ```
    pub fn for_date(date: NaiveDate) -> Self {
        if date.month() >= FISCAL_START_MONTH {
            FiscalYear::starting(date.year())
        } else {
            FiscalYear::starting(date.year() - 1)
        }
    }

    /// Fiscal year of today's UTC date.
    pub fn current() -> Self {
        FiscalYear::for_date(Utc::now().date_naive())
    }

    #[inline]
    pub const fn start_year(&self) -> i32 {
        self.start_year
    }

    /// `"{yy}-{yy+1}"`
    pub fn code(&self) -> String {
        format!(
            "{:02}-{:02}",
            self.start_year.rem_euclid(100),
            (self.start_year + 1).rem_euclid(100)
        )
    }

    /// Two-digit lower year.
    pub fn short_year(&self) -> String {
        format!("{:02}", self.start_year.rem_euclid(100))
    }

    /// `{prefix}-{shortYear}-{NNNN}`, keeping every digit past 9999.
    pub fn format_code(&self, prefix: &str, number: i64) -> String {
        format!("{}-{}-{:04}", prefix, self.short_year(), number)
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_april_boundary() {
        assert_eq!(FiscalYear::for_date(date(2025, 4, 1)).start_year(), 2025);
        assert_eq!(FiscalYear::for_date(date(2025, 12, 31)).start_year(), 2025);
        assert_eq!(FiscalYear::for_date(date(2026, 1, 1)).start_year(), 2025);
        assert_eq!(FiscalYear::for_date(date(2026, 3, 31)).start_year(), 2025);
    }

    #[test]
    fn test_codes() {
        let fy = FiscalYear::starting(2025);
        assert_eq!(fy.code(), "25-26");
        assert_eq!(fy.short_year(), "25");
        assert_eq!(fy.format_code(BEAM_PREFIX, 7), "B-25-0007");
        assert_eq!(fy.format_code(INWARD_PREFIX, 7), "BI-25-0007");
    }

    #[test]
    fn test_century_rollover() {
        assert_eq!(FiscalYear::starting(2099).code(), "99-00");
        assert_eq!(FiscalYear::starting(2009).code(), "09-10");
    }

    #[test]
    fn test_wide_numbers_keep_digits() {
        let fy = FiscalYear::starting(2025);
        assert_eq!(fy.format_code(BEAM_PREFIX, 12345), "B-25-12345");
    }
}
