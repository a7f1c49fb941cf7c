//! Delivery period: a single slot on a fixed granularity's calendar.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};
use chrono_tz::Tz;

use crate::error::{FcurveError, FcurveResult};
use crate::types::date::Date;
use crate::types::granularity::Granularity;

/// A single delivery period at a given [`Granularity`].
///
/// `Day`, `Month`, `Quarter`, and `Year` periods are timezone-naive and
/// carry their canonical start [`Date`]. `QuarterHour`, `HalfHour`, and
/// `Hour` periods carry a timezone-aware start instant so that the number
/// of fine periods on a clock-change day is computed correctly.
///
/// Two periods are equal iff their granularity and start instant coincide,
/// per the delivery-period invariant.
#[derive(Debug, Clone, Copy)]
pub enum Period {
    /// A day-or-coarser period, identified by its first calendar day.
    Calendar(Granularity, Date),
    /// An intraday period, identified by its start instant in a specific
    /// IANA time zone.
    Intraday(Granularity, DateTime<Tz>),
}

impl Period {
    /// Constructs a `Day` period.
    #[must_use]
    pub fn day(date: Date) -> Self {
        Self::Calendar(Granularity::Day, date)
    }

    /// Constructs a `Month` period from its first day. Returns the
    /// granularity-normalised period (the first day of `date`'s month).
    #[must_use]
    pub fn month(date: Date) -> Self {
        Self::Calendar(Granularity::Month, date.start_of_month())
    }

    /// Constructs a `Quarter` period covering `date`'s calendar quarter.
    #[must_use]
    pub fn quarter(date: Date) -> Self {
        Self::Calendar(Granularity::Quarter, date.start_of_quarter())
    }

    /// Constructs a `Year` period covering `date`'s calendar year.
    #[must_use]
    pub fn year(date: Date) -> Self {
        Self::Calendar(Granularity::Year, date.start_of_year())
    }

    /// Constructs an intraday period (`QuarterHour`, `HalfHour`, or `Hour`)
    /// starting at `instant` in time zone `tz`.
    ///
    /// # Errors
    ///
    /// Returns `FcurveError::InvalidArgument` if `granularity` is not one of
    /// the intraday members.
    pub fn intraday(granularity: Granularity, tz: Tz, instant: DateTime<Tz>) -> FcurveResult<Self> {
        if !granularity.is_intraday() {
            return Err(FcurveError::invalid_argument(format!(
                "{granularity} is not an intraday granularity"
            )));
        }
        debug_assert_eq!(instant.timezone(), tz);
        Ok(Self::Intraday(granularity, instant))
    }

    /// The granularity of this period.
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        match self {
            Self::Calendar(g, _) | Self::Intraday(g, _) => *g,
        }
    }

    /// The calendar date this period starts on, in its own time zone for
    /// intraday periods.
    #[must_use]
    pub fn start_date(&self) -> Date {
        match self {
            Self::Calendar(_, d) => *d,
            Self::Intraday(_, dt) => {
                let nd = dt.date_naive();
                Date::from_ymd(nd.year(), nd.month(), nd.day())
                    .expect("chrono NaiveDate is always a valid Date")
            }
        }
    }

    /// The start instant as a UTC timestamp (seconds since the epoch),
    /// used as the ordering/equality key and as the basis for ACT/365 year
    /// fractions.
    #[must_use]
    fn epoch_seconds(&self) -> i64 {
        match self {
            Self::Calendar(_, d) => midnight_utc(d.as_naive_date()).timestamp(),
            Self::Intraday(_, dt) => dt.timestamp(),
        }
    }

    /// Returns the next period at the same granularity (and, for intraday
    /// periods, the same time zone).
    ///
    /// # Errors
    ///
    /// Returns `FcurveError::CalendarError` on calendar overflow.
    pub fn next(&self) -> FcurveResult<Self> {
        match self {
            Self::Calendar(Granularity::Day, d) => Ok(Self::Calendar(Granularity::Day, d.add_days(1))),
            Self::Calendar(Granularity::Month, d) => Ok(Self::month(d.add_months(1)?)),
            Self::Calendar(Granularity::Quarter, d) => Ok(Self::quarter(d.add_months(3)?)),
            Self::Calendar(Granularity::Year, d) => Ok(Self::year(d.add_years(1)?)),
            Self::Calendar(g, _) => unreachable!("{g} is not a Calendar granularity"),
            Self::Intraday(g, dt) => {
                let minutes = g
                    .nominal_minutes()
                    .expect("intraday granularity always has nominal_minutes");
                Ok(Self::Intraday(*g, *dt + Duration::minutes(i64::from(minutes))))
            }
        }
    }

    /// Expands this period into the ordered sequence of `finer` periods it
    /// fully covers. Only defined between `Calendar` granularities (`Year`
    /// down to `Day`); intraday expansion requires a time zone and is
    /// handled by the calendar axis service in `fcurve-curves`.
    ///
    /// # Errors
    ///
    /// Returns `FcurveError::InvalidArgument` if `finer` is not strictly
    /// finer than `self`'s granularity, or if either is an intraday
    /// granularity.
    pub fn expand_to(&self, finer: Granularity) -> FcurveResult<Vec<Self>> {
        let Self::Calendar(g, start) = self else {
            return Err(FcurveError::invalid_argument(
                "intraday expansion requires a time zone; use the calendar axis service",
            ));
        };
        if finer.is_intraday() {
            return Err(FcurveError::invalid_argument(
                "intraday expansion requires a time zone; use the calendar axis service",
            ));
        }
        if finer >= *g {
            return Err(FcurveError::invalid_argument(format!(
                "{finer} is not strictly finer than {g}"
            )));
        }

        let end_exclusive = match g {
            Granularity::Month => start.add_months(1)?,
            Granularity::Quarter => start.add_months(3)?,
            Granularity::Year => start.add_years(1)?,
            Granularity::Day => *start,
            _ => unreachable!("{g} is not a Calendar granularity"),
        };

        let mut periods = Vec::new();
        let mut cursor = match finer {
            Granularity::Day => Self::day(*start),
            Granularity::Month => Self::month(*start),
            Granularity::Quarter => Self::quarter(*start),
            _ => unreachable!("finer is intraday, rejected above"),
        };
        while cursor.start_date() < end_exclusive {
            periods.push(cursor);
            cursor = cursor.next()?;
        }
        Ok(periods)
    }

    /// ACT/365 year fraction from `epoch` to `self`'s start instant
    /// (negative if `self` precedes `epoch`).
    #[must_use]
    pub fn act365_years_since(&self, epoch: &Self) -> f64 {
        (self.epoch_seconds() - epoch.epoch_seconds()) as f64 / (365.0 * 86_400.0)
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<chrono::Utc> {
    chrono::Utc
        .from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is always valid"))
}

impl PartialEq for Period {
    fn eq(&self, other: &Self) -> bool {
        self.granularity() == other.granularity() && self.epoch_seconds() == other.epoch_seconds()
    }
}

impl Eq for Period {}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        self.granularity()
            .cmp(&other.granularity())
            .then_with(|| self.epoch_seconds().cmp(&other.epoch_seconds()))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calendar(g, d) => write!(f, "{g}:{d}"),
            Self::Intraday(g, dt) => write!(f, "{g}:{}", dt.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::London;

    #[test]
    fn month_normalises_to_first_day() {
        let d = Date::from_ymd(2024, 3, 17).unwrap();
        let p = Period::month(d);
        assert_eq!(p.start_date(), Date::from_ymd(2024, 3, 1).unwrap());
    }

    #[test]
    fn quarter_normalises_correctly() {
        let d = Date::from_ymd(2024, 8, 5).unwrap();
        let p = Period::quarter(d);
        assert_eq!(p.start_date(), Date::from_ymd(2024, 7, 1).unwrap());
    }

    #[test]
    fn next_month_steps_correctly_across_year_boundary() {
        let p = Period::month(Date::from_ymd(2024, 12, 1).unwrap());
        let next = p.next().unwrap();
        assert_eq!(next.start_date(), Date::from_ymd(2025, 1, 1).unwrap());
    }

    #[test]
    fn expand_quarter_to_months_yields_three() {
        let q = Period::quarter(Date::from_ymd(2024, 1, 15).unwrap());
        let months = q.expand_to(Granularity::Month).unwrap();
        assert_eq!(months.len(), 3);
        assert_eq!(months[0].start_date(), Date::from_ymd(2024, 1, 1).unwrap());
        assert_eq!(months[2].start_date(), Date::from_ymd(2024, 3, 1).unwrap());
    }

    #[test]
    fn expand_year_to_days_is_leap_aware() {
        let y = Period::year(Date::from_ymd(2024, 1, 1).unwrap());
        let days = y.expand_to(Granularity::Day).unwrap();
        assert_eq!(days.len(), 366);
    }

    #[test]
    fn equality_requires_same_granularity() {
        let d = Date::from_ymd(2024, 1, 1).unwrap();
        assert_ne!(Period::day(d), Period::month(d));
    }

    #[test]
    fn ordering_is_chronological() {
        let jan = Period::month(Date::from_ymd(2024, 1, 1).unwrap());
        let feb = Period::month(Date::from_ymd(2024, 2, 1).unwrap());
        assert!(jan < feb);
    }

    #[test]
    fn intraday_next_steps_by_nominal_duration() {
        let dt = London.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let p = Period::intraday(Granularity::Hour, London, dt).unwrap();
        let next = p.next().unwrap();
        assert_eq!(next.act365_years_since(&p), 1.0 / (365.0 * 24.0));
    }

    #[test]
    fn spring_forward_day_has_23_hours() {
        // UK clocks go forward at 01:00 on 2024-03-31.
        let start = London.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let next_day = London.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let mut count = 0;
        let mut cursor = Period::intraday(Granularity::Hour, London, start).unwrap();
        loop {
            let Period::Intraday(_, dt) = cursor else {
                unreachable!()
            };
            if dt >= next_day {
                break;
            }
            count += 1;
            cursor = cursor.next().unwrap();
        }
        assert_eq!(count, 23);
    }
}
