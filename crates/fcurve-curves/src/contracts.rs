//! Normalises heterogeneous forward quote shapes into a canonical,
//! target-granularity [`Contract`] list.
//!
//! The source system accepts contracts as `(period, price)`,
//! `(start, end, price)`, or `((start, end), price)` tuples, inspected at
//! runtime (`deconstruct_contract`). A statically typed API does not need
//! runtime shape inspection, so the two accepted shapes — a single period
//! or an explicit `[start..end]` range — are expressed directly as
//! [`ContractQuote`] variants.

use chrono_tz::Tz;
use fcurve_core::{Contract, FcurveError, FcurveResult, Granularity, Period};

use crate::calendar::expand_window_to_fine;

/// A single caller-supplied forward quote, before normalisation to the
/// target granularity.
#[derive(Debug, Clone, Copy)]
pub enum ContractQuote {
    /// A quote over a single delivery period (e.g. one calendar month).
    Single(Period, f64),
    /// A quote over an explicit `[start..end]` delivery window.
    Range(Period, Period, f64),
}

impl ContractQuote {
    /// Shorthand for [`ContractQuote::Single`].
    #[must_use]
    pub fn single(period: Period, price: f64) -> Self {
        Self::Single(period, price)
    }

    /// Shorthand for [`ContractQuote::Range`].
    #[must_use]
    pub fn range(start: Period, end: Period, price: f64) -> Self {
        Self::Range(start, end, price)
    }

    fn window_and_price(self) -> (Period, Period, f64) {
        match self {
            Self::Single(p, price) => (p, p, price),
            Self::Range(start, end, price) => (start, end, price),
        }
    }
}

/// Normalises a set of quotes into canonical, non-validated-for-overlap
/// contracts at `target` granularity, sorted ascending by start.
///
/// Each quote's delivery window is expanded down to `target` granularity
/// (e.g. `Q1-2024` at a `Day` target becomes the window from 2024-01-01 to
/// 2024-03-31); `tz` is required whenever `target` is intraday.
///
/// This function does not reject overlapping contracts — that is the
/// bootstrapper's job (or, for the tension spline, the caller's, via an
/// explicit knot set).
///
/// # Errors
///
/// Returns `FcurveError::InvalidArgument` if fewer than one quote is
/// supplied, if a quote's window cannot be expanded to `target` (mismatched
/// granularities, missing time zone for an intraday target), or if any
/// price is not finite.
pub fn normalise(
    quotes: &[ContractQuote],
    target: Granularity,
    tz: Option<Tz>,
) -> FcurveResult<Vec<Contract>> {
    if quotes.is_empty() {
        return Err(FcurveError::invalid_argument("no contracts supplied"));
    }

    let mut contracts = Vec::with_capacity(quotes.len());
    for quote in quotes {
        let (start, end, price) = quote.window_and_price();
        let fine = expand_window_to_fine(start, end, target, tz)?;
        let first = *fine
            .first()
            .ok_or_else(|| FcurveError::invalid_argument("contract window expanded to no periods"))?;
        let last = *fine.last().expect("non-empty, checked above");
        contracts.push(Contract::new(first, last, price)?);
    }

    contracts.sort_by_key(Contract::start);
    Ok(contracts)
}
