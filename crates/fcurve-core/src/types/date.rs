//! Calendar date type used by the day-and-coarser granularities.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use crate::error::{FcurveError, FcurveResult};

/// A calendar date, used as the basis for `Day`, `Month`, `Quarter`, and
/// `Year` granularity periods.
///
/// This is a newtype wrapper around `chrono::NaiveDate`; calendar-day
/// weighting (business days, day-of-week) is deliberately not provided here
/// — callers supply their own `weight`/`adjustment` closures for that.
///
/// # Example
///
/// ```rust
/// use fcurve_core::types::Date;
///
/// let date = Date::from_ymd(2025, 6, 15).unwrap();
/// let future = date.add_months(6).unwrap();
/// assert_eq!(future.year(), 2025);
/// assert_eq!(future.month(), 12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Date(NaiveDate);

impl Date {
    /// Creates a new date from year, month, and day.
    ///
    /// # Errors
    ///
    /// Returns `FcurveError::CalendarError` if the date is invalid.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> FcurveResult<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Date)
            .ok_or_else(|| FcurveError::calendar_error(format!("{year}-{month:02}-{day:02}")))
    }

    /// Creates a date from an ISO 8601 string (YYYY-MM-DD).
    ///
    /// # Errors
    ///
    /// Returns `FcurveError::CalendarError` if the string is not a valid date.
    pub fn parse(s: &str) -> FcurveResult<Self> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Date)
            .map_err(|_| FcurveError::calendar_error(format!("Cannot parse: {s}")))
    }

    /// Returns the year component.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Returns the month component (1-12).
    #[must_use]
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Returns the day component (1-31).
    #[must_use]
    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Checks if the year is a leap year.
    #[must_use]
    pub fn is_leap_year(&self) -> bool {
        self.0.leap_year()
    }

    /// Returns the number of days in the date's month.
    #[must_use]
    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year(), self.month())
    }

    /// Adds a number of days to the date.
    #[must_use]
    pub fn add_days(&self, days: i64) -> Self {
        Date(self.0 + chrono::Duration::days(days))
    }

    /// Adds a number of months to the date.
    ///
    /// If the resulting day would be invalid (e.g., Jan 31 + 1 month),
    /// it rolls back to the last valid day of the month.
    ///
    /// # Errors
    ///
    /// Returns `FcurveError::CalendarError` if the result is out of range.
    pub fn add_months(&self, months: i32) -> FcurveResult<Self> {
        let total_months = self.year() * 12 + self.month() as i32 - 1 + months;
        let new_year = total_months.div_euclid(12);
        let new_month = (total_months.rem_euclid(12) + 1) as u32;

        let max_day = days_in_month(new_year, new_month);
        let new_day = self.day().min(max_day);

        Self::from_ymd(new_year, new_month, new_day)
    }

    /// Adds a number of years to the date.
    ///
    /// # Errors
    ///
    /// Returns `FcurveError::CalendarError` if the result is invalid.
    pub fn add_years(&self, years: i32) -> FcurveResult<Self> {
        let new_year = self.year() + years;
        let max_day = days_in_month(new_year, self.month());
        let new_day = self.day().min(max_day);

        Self::from_ymd(new_year, self.month(), new_day)
    }

    /// Calculates the number of calendar days between two dates.
    #[must_use]
    pub fn days_between(&self, other: &Date) -> i64 {
        (other.0 - self.0).num_days()
    }

    /// Returns the underlying `NaiveDate`.
    #[must_use]
    pub fn as_naive_date(&self) -> NaiveDate {
        self.0
    }

    /// Returns the first day of the month.
    #[must_use]
    pub fn start_of_month(&self) -> Self {
        Date(
            NaiveDate::from_ymd_opt(self.year(), self.month(), 1)
                .expect("first of month is always valid"),
        )
    }

    /// Returns the last day of the month.
    #[must_use]
    pub fn end_of_month(&self) -> Self {
        Date(
            NaiveDate::from_ymd_opt(self.year(), self.month(), self.days_in_month())
                .expect("end of month is always valid"),
        )
    }

    /// Returns the first day of the quarter the date falls in.
    #[must_use]
    pub fn start_of_quarter(&self) -> Self {
        let quarter_month = (self.month() - 1) / 3 * 3 + 1;
        Date(
            NaiveDate::from_ymd_opt(self.year(), quarter_month, 1)
                .expect("first of quarter is always valid"),
        )
    }

    /// Returns the first day of the year.
    #[must_use]
    pub fn start_of_year(&self) -> Self {
        Date(
            NaiveDate::from_ymd_opt(self.year(), 1, 1).expect("first of year is always valid"),
        )
    }

    /// Returns the last day of the year.
    #[must_use]
    pub fn end_of_year(&self) -> Self {
        Date(NaiveDate::from_ymd_opt(self.year(), 12, 31).expect("last of year is always valid"))
    }

    /// Returns the minimum of two dates.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    /// Returns the maximum of two dates.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Date(date)
    }
}

impl From<Date> for NaiveDate {
    fn from(date: Date) -> Self {
        date.0
    }
}

impl Add<i64> for Date {
    type Output = Self;

    fn add(self, days: i64) -> Self::Output {
        self.add_days(days)
    }
}

impl Sub<i64> for Date {
    type Output = Self;

    fn sub(self, days: i64) -> Self::Output {
        self.add_days(-days)
    }
}

impl Sub<Date> for Date {
    type Output = i64;

    /// Returns the number of days between two dates.
    fn sub(self, other: Date) -> Self::Output {
        other.days_between(&self)
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => panic!("invalid month: {month}"),
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_creation() {
        let date = Date::from_ymd(2025, 6, 15).unwrap();
        assert_eq!(date.year(), 2025);
        assert_eq!(date.month(), 6);
        assert_eq!(date.day(), 15);
    }

    #[test]
    fn test_invalid_date() {
        assert!(Date::from_ymd(2025, 2, 30).is_err());
        assert!(Date::from_ymd(2025, 13, 1).is_err());
    }

    #[test]
    fn test_add_months() {
        let date = Date::from_ymd(2025, 1, 31).unwrap();
        let result = date.add_months(1).unwrap();
        assert_eq!(result.month(), 2);
        assert_eq!(result.day(), 28); // Rolled back to last valid day
    }

    #[test]
    fn test_leap_year() {
        assert!(Date::from_ymd(2024, 1, 1).unwrap().is_leap_year());
        assert!(!Date::from_ymd(2025, 1, 1).unwrap().is_leap_year());
        assert!(!Date::from_ymd(2100, 1, 1).unwrap().is_leap_year());
        assert!(Date::from_ymd(2000, 1, 1).unwrap().is_leap_year());
    }

    #[test]
    fn test_days_between() {
        let d1 = Date::from_ymd(2025, 1, 1).unwrap();
        let d2 = Date::from_ymd(2025, 1, 31).unwrap();
        assert_eq!(d1.days_between(&d2), 30);
    }

    #[test]
    fn test_parse() {
        let date = Date::parse("2025-06-15").unwrap();
        assert_eq!(date.year(), 2025);
        assert_eq!(date.month(), 6);
        assert_eq!(date.day(), 15);
    }

    #[test]
    fn test_date_arithmetic_operators() {
        let d1 = Date::from_ymd(2025, 1, 1).unwrap();
        let d2 = d1 + 10;
        assert_eq!(d2.day(), 11);
        let d3 = d2 - 5;
        assert_eq!(d3.day(), 6);
        assert_eq!(d2 - d1, 10);
    }

    #[test]
    fn test_start_end_of_period() {
        let date = Date::from_ymd(2025, 6, 15).unwrap();

        assert_eq!(date.start_of_month(), Date::from_ymd(2025, 6, 1).unwrap());
        assert_eq!(date.end_of_month(), Date::from_ymd(2025, 6, 30).unwrap());
        assert_eq!(date.start_of_quarter(), Date::from_ymd(2025, 4, 1).unwrap());
        assert_eq!(date.start_of_year(), Date::from_ymd(2025, 1, 1).unwrap());
        assert_eq!(date.end_of_year(), Date::from_ymd(2025, 12, 31).unwrap());
    }

    #[test]
    fn test_min_max() {
        let d1 = Date::from_ymd(2025, 1, 1).unwrap();
        let d2 = Date::from_ymd(2025, 6, 15).unwrap();

        assert_eq!(d1.min(d2), d1);
        assert_eq!(d1.max(d2), d2);
        assert_eq!(d2.min(d1), d1);
        assert_eq!(d2.max(d1), d2);
    }

    #[test]
    fn test_display() {
        let date = Date::from_ymd(2025, 6, 15).unwrap();
        assert_eq!(format!("{}", date), "2025-06-15");
    }
}
