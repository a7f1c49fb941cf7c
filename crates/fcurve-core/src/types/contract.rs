//! Forward contract quotes and shaping constraints.

use crate::error::{FcurveError, FcurveResult};
use crate::types::period::Period;

/// A forward contract: a quoted price for the weighted average of the
/// unknown fine-grained curve across `[start..end]` inclusive.
///
/// `start` and `end` must share a granularity, with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contract {
    start: Period,
    end: Period,
    price: f64,
}

impl Contract {
    /// Constructs a contract spanning a single period.
    ///
    /// # Errors
    ///
    /// Returns `FcurveError::InvalidArgument` if `price` is not finite.
    pub fn single(period: Period, price: f64) -> FcurveResult<Self> {
        Self::new(period, period, price)
    }

    /// Constructs a contract spanning `[start..end]` inclusive.
    ///
    /// # Errors
    ///
    /// Returns `FcurveError::InvalidArgument` if `start` and `end` have
    /// different granularities, if `start > end`, or if `price` is not
    /// finite.
    pub fn new(start: Period, end: Period, price: f64) -> FcurveResult<Self> {
        if start.granularity() != end.granularity() {
            return Err(FcurveError::invalid_argument(format!(
                "contract start ({start}) and end ({end}) have different granularities"
            )));
        }
        if start > end {
            return Err(FcurveError::invalid_argument(format!(
                "contract start ({start}) is after end ({end})"
            )));
        }
        if !price.is_finite() {
            return Err(FcurveError::invalid_argument(format!(
                "contract price {price} is not finite"
            )));
        }
        Ok(Self { start, end, price })
    }

    /// The first delivery period covered by this contract.
    #[must_use]
    pub fn start(&self) -> Period {
        self.start
    }

    /// The last delivery period covered by this contract (inclusive).
    #[must_use]
    pub fn end(&self) -> Period {
        self.end
    }

    /// The quoted price.
    #[must_use]
    pub fn price(&self) -> f64 {
        self.price
    }

    /// True if `self` and `other` cover any common delivery period.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// A delivery window referenced by a [`ShapingConstraint`], expressed as an
/// inclusive `[start..end]` range of periods.
pub type Window = (Period, Period);

/// A caller-specified constraint on the ratio or spread between the
/// weighted averages of two delivery windows on the output curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapingConstraint {
    /// `avg(numerator) / avg(denominator) = ratio`.
    Ratio {
        /// The numerator window.
        numerator: Window,
        /// The denominator window.
        denominator: Window,
        /// The required ratio.
        ratio: f64,
    },
    /// `avg(long) - avg(short) = spread`.
    Spread {
        /// The long (minuend) window.
        long: Window,
        /// The short (subtrahend) window.
        short: Window,
        /// The required spread.
        spread: f64,
    },
}

impl ShapingConstraint {
    /// Constructs a ratio constraint.
    ///
    /// # Errors
    ///
    /// Returns `FcurveError::InvalidArgument` if either window is malformed
    /// or `ratio` is not finite.
    pub fn ratio(numerator: Window, denominator: Window, ratio: f64) -> FcurveResult<Self> {
        validate_window(numerator)?;
        validate_window(denominator)?;
        if !ratio.is_finite() {
            return Err(FcurveError::invalid_argument(format!(
                "shaping ratio {ratio} is not finite"
            )));
        }
        Ok(Self::Ratio {
            numerator,
            denominator,
            ratio,
        })
    }

    /// Constructs a spread constraint.
    ///
    /// # Errors
    ///
    /// Returns `FcurveError::InvalidArgument` if either window is malformed
    /// or `spread` is not finite.
    pub fn spread(long: Window, short: Window, spread: f64) -> FcurveResult<Self> {
        validate_window(long)?;
        validate_window(short)?;
        if !spread.is_finite() {
            return Err(FcurveError::invalid_argument(format!(
                "shaping spread {spread} is not finite"
            )));
        }
        Ok(Self::Spread { long, short, spread })
    }
}

fn validate_window((start, end): Window) -> FcurveResult<()> {
    if start.granularity() != end.granularity() {
        return Err(FcurveError::invalid_argument(
            "shaping window start and end have different granularities",
        ));
    }
    if start > end {
        return Err(FcurveError::invalid_argument(
            "shaping window start is after end",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Date;

    fn month(y: i32, m: u32) -> Period {
        Period::month(Date::from_ymd(y, m, 1).unwrap())
    }

    #[test]
    fn rejects_mismatched_granularity() {
        let day = Period::day(Date::from_ymd(2024, 1, 1).unwrap());
        let mo = month(2024, 1);
        assert!(Contract::new(day, mo, 1.0).is_err());
    }

    #[test]
    fn rejects_reversed_window() {
        assert!(Contract::new(month(2024, 3), month(2024, 1), 1.0).is_err());
    }

    #[test]
    fn rejects_non_finite_price() {
        assert!(Contract::single(month(2024, 1), f64::NAN).is_err());
    }

    #[test]
    fn overlap_detection() {
        let a = Contract::new(month(2024, 1), month(2024, 3), 1.0).unwrap();
        let b = Contract::new(month(2024, 3), month(2024, 6), 1.0).unwrap();
        let c = Contract::new(month(2024, 4), month(2024, 6), 1.0).unwrap();
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn shaping_ratio_rejects_non_finite() {
        let a = (month(2024, 1), month(2024, 1));
        let b = (month(2024, 2), month(2024, 2));
        assert!(ShapingConstraint::ratio(a, b, f64::INFINITY).is_err());
        assert!(ShapingConstraint::ratio(a, b, 1.09).is_ok());
    }
}
