//! Calendar month windows.
//!
//! A [`Period`] names one month. Generation, pending scans, reports and the CSV
//! export all filter transactions by the inclusive window `[first_day, last_day]`.

use crate::errors::{Error, Result};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest and largest valid `day_of_month` on a recurring expense.
pub const DAY_OF_MONTH_RANGE: (i32, i32) = (1, 31);

/// One calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Builds a period, validating the month and year.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when `month` is not in `1..=12` or the
    /// year is outside chrono's supported range.
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::validation(format!("month must be between 1 and 12, got {month}")));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(Error::validation(format!("year {year} is out of range")));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parses the `YYYY-MM` form produced by [`Period::key`].
    pub fn parse_key(key: &str) -> Result<Self> {
        let (year, month) = key
            .split_once('-')
            .ok_or_else(|| Error::validation(format!("invalid period '{key}'")))?;
        let year = year
            .parse()
            .map_err(|_| Error::validation(format!("invalid period '{key}'")))?;
        let month = month
            .parse()
            .map_err(|_| Error::validation(format!("invalid period '{key}'")))?;
        Self::new(month, year)
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the month, accounting for leap years.
    #[must_use]
    pub fn last_day(self) -> NaiveDate {
        self.first_day()
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// The date a template with `day_of_month` falls on in this month, clamped
    /// to the month's last day (31 in February gives the 28th or 29th).
    #[must_use]
    pub fn clamped_date(self, day_of_month: i32) -> NaiveDate {
        let last = self.last_day();
        let day = u32::try_from(clamp_day_of_month(day_of_month)).unwrap_or(1);
        last.with_day(day.min(last.day())).unwrap_or(last)
    }

    /// `YYYY-MM`, the form stored in `transactions.recurrence_month`.
    #[must_use]
    pub fn key(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Clamps a day-of-month to `[1, 31]`.
#[must_use]
pub const fn clamp_day_of_month(day: i32) -> i32 {
    if day < DAY_OF_MONTH_RANGE.0 {
        DAY_OF_MONTH_RANGE.0
    } else if day > DAY_OF_MONTH_RANGE.1 {
        DAY_OF_MONTH_RANGE.1
    } else {
        day
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_last_day_handles_leap_years() {
        assert_eq!(Period::new(2, 2023).unwrap().last_day(), date(2023, 2, 28));
        assert_eq!(Period::new(2, 2024).unwrap().last_day(), date(2024, 2, 29));
        assert_eq!(Period::new(12, 2024).unwrap().last_day(), date(2024, 12, 31));
        assert_eq!(Period::new(4, 2024).unwrap().last_day(), date(2024, 4, 30));
    }

    #[test]
    fn test_clamped_date() {
        let feb = Period::new(2, 2023).unwrap();
        assert_eq!(feb.clamped_date(31), date(2023, 2, 28));
        assert_eq!(feb.clamped_date(15), date(2023, 2, 15));
        assert_eq!(feb.clamped_date(0), date(2023, 2, 1));
        assert_eq!(Period::new(2, 2024).unwrap().clamped_date(31), date(2024, 2, 29));
    }

    #[test]
    fn test_new_rejects_invalid_month() {
        assert!(matches!(Period::new(0, 2024), Err(Error::Validation { .. })));
        assert!(matches!(Period::new(13, 2024), Err(Error::Validation { .. })));
    }

    #[test]
    fn test_key_round_trip() {
        let period = Period::new(3, 2024).unwrap();
        assert_eq!(period.key(), "2024-03");
        assert_eq!(Period::parse_key("2024-03").unwrap(), period);
        assert!(Period::parse_key("March").is_err());
    }

    #[test]
    fn test_clamp_day_of_month() {
        assert_eq!(clamp_day_of_month(-4), 1);
        assert_eq!(clamp_day_of_month(17), 17);
        assert_eq!(clamp_day_of_month(45), 31);
    }
}
