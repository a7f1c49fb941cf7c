//! Delivery-period granularity.

use std::fmt;

use crate::error::{FcurveError, FcurveResult};

/// The resolution at which a delivery period is expressed.
///
/// Intraday members (`QuarterHour`, `HalfHour`, `Hour`) are always
/// interpreted against an IANA time zone so that clock-change days produce
/// the correct number of fine periods (23/25 hours, 46/50 half-hours,
/// 92/100 quarter-hours). `Day` and coarser members are timezone-naive
/// calendar arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Granularity {
    /// 15-minute delivery period.
    QuarterHour,
    /// 30-minute delivery period.
    HalfHour,
    /// 1-hour delivery period.
    Hour,
    /// 1-day delivery period.
    Day,
    /// Calendar-month delivery period.
    Month,
    /// Calendar-quarter delivery period.
    Quarter,
    /// Calendar-year delivery period.
    Year,
}

impl Granularity {
    /// Parses a granularity from the string tags accepted by the public API
    /// (`"15min"`, `"30min"`, `"H"`, `"D"`, `"M"`, `"Q"`, `"A"`).
    ///
    /// # Errors
    ///
    /// Returns `FcurveError::InvalidArgument` if `s` is not a recognised tag.
    pub fn parse(s: &str) -> FcurveResult<Self> {
        match s {
            "15min" => Ok(Self::QuarterHour),
            "30min" => Ok(Self::HalfHour),
            "H" => Ok(Self::Hour),
            "D" => Ok(Self::Day),
            "M" => Ok(Self::Month),
            "Q" => Ok(Self::Quarter),
            "A" => Ok(Self::Year),
            other => Err(FcurveError::invalid_argument(format!(
                "unrecognised granularity tag {other:?}; expected one of 15min/30min/H/D/M/Q/A"
            ))),
        }
    }

    /// True for `QuarterHour`, `HalfHour`, and `Hour` — the members whose
    /// fine-period count on a given day depends on the time zone's
    /// clock-change rules.
    #[must_use]
    pub fn is_intraday(self) -> bool {
        matches!(self, Self::QuarterHour | Self::HalfHour | Self::Hour)
    }

    /// Nominal minutes per period on a day with no clock change. Intraday
    /// members only; coarser members have no fixed-length nominal value.
    #[must_use]
    pub fn nominal_minutes(self) -> Option<u32> {
        match self {
            Self::QuarterHour => Some(15),
            Self::HalfHour => Some(30),
            Self::Hour => Some(60),
            _ => None,
        }
    }

    /// Returns the next-coarser granularity this one tiles exactly, used by
    /// the contract normaliser when checking a supplied target granularity
    /// is no finer than the period it is expanding.
    #[must_use]
    pub fn coarser(self) -> Option<Self> {
        match self {
            Self::QuarterHour => Some(Self::HalfHour),
            Self::HalfHour => Some(Self::Hour),
            Self::Hour => Some(Self::Day),
            Self::Day => Some(Self::Month),
            Self::Month => Some(Self::Quarter),
            Self::Quarter => Some(Self::Year),
            Self::Year => None,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::QuarterHour => "15min",
            Self::HalfHour => "30min",
            Self::Hour => "H",
            Self::Day => "D",
            Self::Month => "M",
            Self::Quarter => "Q",
            Self::Year => "A",
        };
        write!(f, "{tag}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tags() {
        assert_eq!(Granularity::parse("15min").unwrap(), Granularity::QuarterHour);
        assert_eq!(Granularity::parse("D").unwrap(), Granularity::Day);
        assert_eq!(Granularity::parse("Q").unwrap(), Granularity::Quarter);
    }

    #[test]
    fn rejects_unknown_tag() {
        assert!(Granularity::parse("W").is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for g in [
            Granularity::QuarterHour,
            Granularity::HalfHour,
            Granularity::Hour,
            Granularity::Day,
            Granularity::Month,
            Granularity::Quarter,
            Granularity::Year,
        ] {
            assert_eq!(Granularity::parse(&g.to_string()).unwrap(), g);
        }
    }

    #[test]
    fn intraday_classification() {
        assert!(Granularity::Hour.is_intraday());
        assert!(!Granularity::Day.is_intraday());
    }
}
