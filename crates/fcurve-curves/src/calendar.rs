//! Calendar service mapping delivery periods to a dense fine-period index.
//!
//! [`fcurve_core::Period`] only knows how to expand itself across
//! `Calendar` granularities (`Year` down to `Day`); intraday expansion needs
//! a time zone, which a bare `Day` period does not carry. This module
//! supplies that missing piece plus the `period <-> index` axis used by
//! every solver in this crate, replacing the source system's reliance on
//! a host runtime's `TimePeriod` objects with a narrow Rust interface, per
//! the Design Notes.

use std::collections::HashMap;

use chrono::{Duration, TimeZone};
use chrono_tz::Tz;
use fcurve_core::{Date, FcurveError, FcurveResult, Granularity, Period};

/// Expands a single calendar day into the ordered sequence of intraday
/// periods (`QuarterHour`, `HalfHour`, or `Hour`) it contains in time zone
/// `tz`.
///
/// Clock-change days produce 23 or 25 hours (46/50 half-hours, 92/100
/// quarter-hours): the walk is driven by the actual UTC instants of local
/// midnight on `date` and local midnight on the following day, not by a
/// fixed count, so DST transitions fall out automatically.
///
/// # Errors
///
/// Returns `FcurveError::InvalidArgument` if `target` is not an intraday
/// granularity, and `FcurveError::CalendarError` if local midnight is
/// ambiguous or nonexistent for `date` in `tz` (practically unreachable —
/// midnight transitions are not observed by any IANA zone).
pub fn expand_day_intraday(date: Date, tz: Tz, target: Granularity) -> FcurveResult<Vec<Period>> {
    if !target.is_intraday() {
        return Err(FcurveError::invalid_argument(format!(
            "{target} is not an intraday granularity"
        )));
    }

    let naive_midnight = date.as_naive_date().and_hms_opt(0, 0, 0).expect("midnight is valid");
    let naive_next_midnight = (date.as_naive_date() + Duration::days(1))
        .and_hms_opt(0, 0, 0)
        .expect("midnight is valid");

    let start = single_local(tz, naive_midnight, date)?;
    let end_exclusive = single_local(tz, naive_next_midnight, date.add_days(1))?;

    let mut periods = Vec::new();
    let mut cursor = Period::intraday(target, tz, start)?;
    loop {
        let Period::Intraday(_, dt) = cursor else {
            unreachable!("constructed as Intraday above")
        };
        if dt >= end_exclusive {
            break;
        }
        periods.push(cursor);
        cursor = cursor.next()?;
    }
    Ok(periods)
}

fn single_local(
    tz: Tz,
    naive: chrono::NaiveDateTime,
    date_for_error: Date,
) -> FcurveResult<chrono::DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .single()
        .or_else(|| tz.from_local_datetime(&naive).earliest())
        .ok_or_else(|| {
            FcurveError::calendar_error(format!(
                "midnight on {date_for_error} is not a valid local instant in this time zone"
            ))
        })
}

/// Expands a contract delivery window `[start..end]` (inclusive) down to
/// the ordered sequence of `target`-granularity periods it fully covers.
///
/// `tz` is required whenever `target` is an intraday granularity.
///
/// # Errors
///
/// Returns `FcurveError::InvalidArgument` if `start`/`end` have different
/// granularities, if `target` is not strictly finer than (or equal to)
/// that granularity, or if `target` is intraday and `tz` is `None`.
pub fn expand_window_to_fine(
    start: Period,
    end: Period,
    target: Granularity,
    tz: Option<Tz>,
) -> FcurveResult<Vec<Period>> {
    if start.granularity() != end.granularity() {
        return Err(FcurveError::invalid_argument(
            "window start and end have different granularities",
        ));
    }
    let window_granularity = start.granularity();

    if window_granularity == target {
        return walk_inclusive(start, end);
    }

    if target.is_intraday() {
        let tz = tz.ok_or_else(|| {
            FcurveError::invalid_argument("intraday target granularity requires a time zone")
        })?;
        let days = if window_granularity == Granularity::Day {
            walk_inclusive(start, end)?
        } else {
            window_to_days(start, end)?
        };
        let mut fine = Vec::new();
        for day in days {
            fine.extend(expand_day_intraday(day.start_date(), tz, target)?);
        }
        return Ok(fine);
    }

    if target >= window_granularity {
        return Err(FcurveError::invalid_argument(format!(
            "{target} is not finer than {window_granularity}"
        )));
    }
    let mut fine = Vec::new();
    let mut cursor = start;
    loop {
        fine.extend(cursor.expand_to(target)?);
        if cursor == end {
            break;
        }
        cursor = cursor.next()?;
    }
    Ok(fine)
}

fn window_to_days(start: Period, end: Period) -> FcurveResult<Vec<Period>> {
    let mut days = Vec::new();
    let mut cursor = start;
    loop {
        days.extend(cursor.expand_to(Granularity::Day)?);
        if cursor == end {
            break;
        }
        cursor = cursor.next()?;
    }
    Ok(days)
}

fn walk_inclusive(start: Period, end: Period) -> FcurveResult<Vec<Period>> {
    let mut periods = Vec::new();
    let mut cursor = start;
    loop {
        periods.push(cursor);
        if cursor == end {
            break;
        }
        cursor = cursor.next()?;
    }
    Ok(periods)
}

/// A dense, zero-based index over the fine periods spanning
/// `[first..last]` at a single granularity.
///
/// This is the "calendar service for period <-> timestamp <-> index"
/// called for in the Design Notes: every solver works against `0..len()`
/// integer indices internally and converts back to `Period` only for
/// output.
pub struct PeriodAxis {
    periods: Vec<Period>,
    index: HashMap<Period, usize>,
}

impl PeriodAxis {
    /// Builds a dense axis spanning `[first..last]` inclusive, both already
    /// at the same (fine) granularity.
    ///
    /// # Errors
    ///
    /// Returns `FcurveError::InvalidArgument` if `first` and `last` have
    /// different granularities or `first > last`.
    pub fn build(first: Period, last: Period) -> FcurveResult<Self> {
        if first.granularity() != last.granularity() {
            return Err(FcurveError::invalid_argument(
                "axis bounds have different granularities",
            ));
        }
        if first > last {
            return Err(FcurveError::invalid_argument("axis first is after last"));
        }
        let periods = walk_inclusive(first, last)?;
        let index = periods
            .iter()
            .enumerate()
            .map(|(i, p)| (*p, i))
            .collect();
        Ok(Self { periods, index })
    }

    /// Number of fine periods on the axis.
    #[must_use]
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// True if the axis has no periods (never constructed via `build`,
    /// since `first <= last` always yields at least one).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// The period at index `i`.
    #[must_use]
    pub fn period(&self, i: usize) -> Period {
        self.periods[i]
    }

    /// The dense index of `period`, if it lies on this axis.
    #[must_use]
    pub fn index_of(&self, period: Period) -> Option<usize> {
        self.index.get(&period).copied()
    }

    /// All periods in ascending order.
    #[must_use]
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// ACT/365 year fraction of index `i` relative to the axis start.
    #[must_use]
    pub fn year_fraction(&self, i: usize) -> f64 {
        self.periods[i].act365_years_since(&self.periods[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::London;

    #[test]
    fn expands_month_window_to_days() {
        let jan = Period::month(Date::from_ymd(2024, 1, 1).unwrap());
        let feb = Period::month(Date::from_ymd(2024, 2, 1).unwrap());
        let days = expand_window_to_fine(jan, feb, Granularity::Day, None).unwrap();
        // Jan (31) + Feb (29, 2024 is a leap year)
        assert_eq!(days.len(), 31 + 29);
    }

    #[test]
    fn spring_forward_day_has_23_hours() {
        let day = Date::from_ymd(2024, 3, 31).unwrap();
        let hours = expand_day_intraday(day, London, Granularity::Hour).unwrap();
        assert_eq!(hours.len(), 23);
    }

    #[test]
    fn autumn_back_day_has_50_half_hours() {
        // UK clocks go back at 02:00 on 2024-10-27 -> 25 hours -> 50 half-hours.
        let day = Date::from_ymd(2024, 10, 27).unwrap();
        let halves = expand_day_intraday(day, London, Granularity::HalfHour).unwrap();
        assert_eq!(halves.len(), 50);
    }

    #[test]
    fn axis_round_trips_index() {
        let first = Period::day(Date::from_ymd(2024, 1, 1).unwrap());
        let last = Period::day(Date::from_ymd(2024, 1, 10).unwrap());
        let axis = PeriodAxis::build(first, last).unwrap();
        assert_eq!(axis.len(), 10);
        assert_eq!(axis.index_of(last), Some(9));
        assert_eq!(axis.period(0), first);
    }
}
